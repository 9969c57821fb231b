//! Deadline-based connect watchdog and heartbeat timer.
//!
//! Neither timer schedules anything itself. Each exposes the instant it next
//! needs attention and is polled with the current time by its owner.

use std::time::{Duration, Instant};

/// Connect watchdog used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Heartbeat interval used when none is configured.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// One-shot watchdog over a connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl ConnectTimer {
    /// `None` or zero falls back to [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn new(timeout: Option<Duration>) -> Self {
        let timeout = timeout
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arm the watchdog, replacing any earlier deadline.
    pub fn start(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` exactly once, when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// What the heartbeat timer wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    /// Nothing is due.
    Idle,
    /// Write a PINGREQ; the timer has already rescheduled itself.
    SendPing,
    /// No traffic since the last ping; the peer is unresponsive.
    TimedOut,
}

/// Send-side heartbeat: ping every interval, time out if nothing reset it.
///
/// Every outbound write and every PINGRESP calls [`reset`](Self::reset).
/// When the deadline passes the timer either asks for a ping (it was reset
/// since it last fired) or declares the peer unresponsive (it was not).
#[derive(Debug, Clone)]
pub struct KeepAlive {
    interval: Duration,
    armed: bool,
    deadline: Option<Instant>,
}

impl KeepAlive {
    /// `None` or zero falls back to [`DEFAULT_KEEP_ALIVE_INTERVAL`].
    pub fn new(interval: Option<Duration>) -> Self {
        let interval = interval
            .filter(|interval| !interval.is_zero())
            .unwrap_or(DEFAULT_KEEP_ALIVE_INTERVAL);
        Self {
            interval,
            armed: false,
            deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Mark activity and push the deadline one interval out.
    pub fn reset(&mut self, now: Instant) {
        self.armed = true;
        self.deadline = Some(now + self.interval);
    }

    /// Stop the timer. A later `reset` starts it again.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire if due.
    pub fn poll(&mut self, now: Instant) -> KeepAliveAction {
        let Some(deadline) = self.deadline else {
            return KeepAliveAction::Idle;
        };
        if now < deadline {
            return KeepAliveAction::Idle;
        }
        if !self.armed {
            self.deadline = None;
            return KeepAliveAction::TimedOut;
        }
        self.armed = false;
        self.deadline = Some(now + self.interval);
        KeepAliveAction::SendPing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn connect_timer_defaults_to_thirty_seconds() {
        assert_eq!(ConnectTimer::new(None).timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(ConnectTimer::new(Some(Duration::ZERO)).timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(ConnectTimer::new(Some(3 * SEC)).timeout(), 3 * SEC);
    }

    #[test]
    fn connect_timer_fires_once() {
        let t0 = Instant::now();
        let mut timer = ConnectTimer::new(Some(2 * SEC));
        assert!(!timer.poll(t0));

        timer.start(t0);
        assert_eq!(timer.deadline(), Some(t0 + 2 * SEC));
        assert!(!timer.poll(t0 + SEC));
        assert!(timer.poll(t0 + 2 * SEC));
        assert!(!timer.poll(t0 + 3 * SEC));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn connect_timer_cancel() {
        let t0 = Instant::now();
        let mut timer = ConnectTimer::new(Some(SEC));
        timer.start(t0);
        timer.cancel();
        assert!(!timer.poll(t0 + 5 * SEC));
    }

    #[test]
    fn keepalive_interval_selection() {
        assert_eq!(KeepAlive::new(None).interval(), DEFAULT_KEEP_ALIVE_INTERVAL);
        assert_eq!(
            KeepAlive::new(Some(Duration::ZERO)).interval(),
            DEFAULT_KEEP_ALIVE_INTERVAL
        );
        assert_eq!(KeepAlive::new(Some(2 * SEC)).interval(), 2 * SEC);
    }

    #[test]
    fn keepalive_is_idle_until_reset() {
        let t0 = Instant::now();
        let mut keepalive = KeepAlive::new(Some(SEC));
        assert_eq!(keepalive.deadline(), None);
        assert_eq!(keepalive.poll(t0 + 10 * SEC), KeepAliveAction::Idle);
    }

    #[test]
    fn keepalive_pings_then_times_out() {
        let t0 = Instant::now();
        let mut keepalive = KeepAlive::new(Some(5 * SEC));
        keepalive.reset(t0);

        assert_eq!(keepalive.poll(t0 + 4 * SEC), KeepAliveAction::Idle);
        assert_eq!(keepalive.poll(t0 + 5 * SEC), KeepAliveAction::SendPing);
        assert!(!keepalive.is_armed());
        assert_eq!(keepalive.deadline(), Some(t0 + 10 * SEC));

        assert_eq!(keepalive.poll(t0 + 10 * SEC), KeepAliveAction::TimedOut);
        assert_eq!(keepalive.deadline(), None);
    }

    #[test]
    fn keepalive_reset_between_pings_keeps_link_alive() {
        let t0 = Instant::now();
        let mut keepalive = KeepAlive::new(Some(5 * SEC));
        keepalive.reset(t0);
        assert_eq!(keepalive.poll(t0 + 5 * SEC), KeepAliveAction::SendPing);

        // PINGRESP arrives.
        keepalive.reset(t0 + 6 * SEC);
        assert_eq!(keepalive.deadline(), Some(t0 + 11 * SEC));
        assert_eq!(keepalive.poll(t0 + 10 * SEC), KeepAliveAction::Idle);
        assert_eq!(keepalive.poll(t0 + 11 * SEC), KeepAliveAction::SendPing);
    }

    #[test]
    fn zero_keepalive_uses_default_interval() {
        let t0 = Instant::now();
        let mut keepalive = KeepAlive::new(Some(Duration::ZERO));
        keepalive.reset(t0);
        assert!(keepalive.is_armed());
        assert_eq!(keepalive.deadline(), Some(t0 + DEFAULT_KEEP_ALIVE_INTERVAL));
        assert_eq!(
            keepalive.poll(t0 + DEFAULT_KEEP_ALIVE_INTERVAL),
            KeepAliveAction::SendPing
        );
    }

    #[test]
    fn keepalive_cancel() {
        let t0 = Instant::now();
        let mut keepalive = KeepAlive::new(None);
        keepalive.reset(t0);
        keepalive.cancel();
        assert_eq!(keepalive.poll(t0 + 60 * SEC), KeepAliveAction::Idle);
    }
}
