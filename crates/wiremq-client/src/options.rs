use std::fmt;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::{ClientError, Result};

/// Default delay between a link opening and the CONNECT frame being written.
pub const DEFAULT_OPEN_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Default pause before the endpoint list is retried from the start.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default identifier ceiling; identifiers run `1..max` and then wrap to 1.
pub const DEFAULT_MAX_MESSAGE_IDENTIFIER: u32 = 65_536;

/// Options for one `connect` call.
#[derive(Clone)]
pub struct ConnectOptions {
    /// Endpoints tried in order on failover. Must not be empty.
    pub uris: Vec<String>,
    /// Identity sent in the CONNECT payload.
    pub user_name: Option<String>,
    /// Access token sent in the CONNECT payload. Never logged.
    pub password: Option<String>,
    /// Heartbeat interval. `None` or zero uses 5 s.
    pub keep_alive_interval: Option<Duration>,
    /// Connect watchdog. `None` or zero uses 30 s.
    pub timeout: Option<Duration>,
    /// Delay between the link opening and the CONNECT write.
    pub open_settle_delay: Duration,
    /// Pause after every endpoint failed before starting over at the first.
    pub retry_delay: Duration,
    /// Identifier ceiling, in `2..=65536`.
    pub max_message_identifier: u32,
    /// Opaque value echoed back in connect success and failure events.
    pub invocation_context: Option<String>,
}

impl ConnectOptions {
    /// Options for a single endpoint.
    pub fn new(uri: impl Into<String>) -> Self {
        Self::with_uris([uri])
    }

    /// Options for an ordered failover list.
    pub fn with_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uris: uris.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_credentials(
        mut self,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user_name = Some(user_name.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = Some(interval);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_open_settle_delay(mut self, delay: Duration) -> Self {
        self.open_settle_delay = delay;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_message_identifier(mut self, max: u32) -> Self {
        self.max_message_identifier = max;
        self
    }

    pub fn with_invocation_context(mut self, context: impl Into<String>) -> Self {
        self.invocation_context = Some(context.into());
        self
    }

    /// Credentials for the CONNECT payload.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user_name.clone(), self.password.clone())
    }

    /// Reject option combinations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.uris.is_empty() {
            return Err(ClientError::InvalidArgument {
                value: "[]".to_string(),
                name: "uris",
            });
        }
        if let Some(uri) = self.uris.iter().find(|uri| uri.trim().is_empty()) {
            return Err(ClientError::InvalidArgument {
                value: format!("{uri:?}"),
                name: "uris",
            });
        }
        if !(2..=DEFAULT_MAX_MESSAGE_IDENTIFIER).contains(&self.max_message_identifier) {
            return Err(ClientError::InvalidArgument {
                value: self.max_message_identifier.to_string(),
                name: "max_message_identifier",
            });
        }
        Ok(())
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            uris: Vec::new(),
            user_name: None,
            password: None,
            keep_alive_interval: None,
            timeout: None,
            open_settle_delay: DEFAULT_OPEN_SETTLE_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_message_identifier: DEFAULT_MAX_MESSAGE_IDENTIFIER,
            invocation_context: None,
        }
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ConnectOptions");
        dbg.field("uris", &self.uris)
            .field("user_name", &self.user_name);
        if let Some(password) = &self.password {
            dbg.field(
                "password",
                &format_args!("<redacted:{} bytes>", password.len()),
            );
        } else {
            dbg.field("password", &Option::<String>::None);
        }
        dbg.field("keep_alive_interval", &self.keep_alive_interval)
            .field("timeout", &self.timeout)
            .field("open_settle_delay", &self.open_settle_delay)
            .field("retry_delay", &self.retry_delay)
            .field("max_message_identifier", &self.max_message_identifier)
            .field("invocation_context", &self.invocation_context)
            .finish()
    }
}
