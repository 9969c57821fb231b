use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{debug, info};
use wiremq_client::{Client, ClientEvent};

use crate::cmd::ConnectArgs;
use crate::exit::{client_error, io_error, reason_error, CliError, CliResult, INTERNAL, TIMEOUT};

pub fn runtime() -> CliResult<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

/// Spawn a client and wait until the connection is acknowledged.
///
/// Endpoints are tried in order; the first `ConnectFailed` means every
/// endpoint was exhausted and ends the attempt.
pub async fn connect(args: &ConnectArgs) -> CliResult<Client> {
    let options = args.options()?;
    let mut client = Client::spawn().map_err(|err| client_error("client setup failed", err))?;
    client
        .connect(options)
        .await
        .map_err(|err| client_error("connect failed", err))?;

    loop {
        match client.next_event().await {
            Some(ClientEvent::Connected { .. }) => break,
            Some(ClientEvent::ConnectFailed { reason, .. }) => {
                client.shutdown().await;
                return Err(reason_error("connect failed", &reason));
            }
            Some(other) => debug!(?other, "event before connect"),
            None => return Err(stopped()),
        }
    }

    if let Ok(Some(uri)) = client.current_uri().await {
        info!(%uri, "connected");
    }
    Ok(client)
}

/// Wait for the next event, failing after `timeout`.
pub async fn next_event(client: &mut Client, timeout: Duration) -> CliResult<ClientEvent> {
    match tokio::time::timeout(timeout, client.next_event()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err(stopped()),
        Err(_) => Err(CliError::new(
            TIMEOUT,
            format!("no event within {}ms", timeout.as_millis()),
        )),
    }
}

/// Disconnect if still connected and stop the client task.
pub async fn close(client: Client) {
    if let Err(err) = client.disconnect().await {
        debug!(%err, "disconnect skipped");
    }
    client.shutdown().await;
}

fn stopped() -> CliError {
    CliError::new(INTERNAL, "client task stopped")
}
