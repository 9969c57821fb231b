use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wiremq_client::{Client, ClientEvent};

use crate::cmd::{session, ListenArgs};
use crate::exit::{reason_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let runtime = session::runtime()?;
    runtime.block_on(async {
        let mut client = session::connect(&args.connect).await?;
        let result = receive(&mut client, &args, format, &cancel).await;
        session::close(client).await;
        result
    })
}

async fn receive(
    client: &mut Client,
    args: &ListenArgs,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> CliResult<i32> {
    let mut printed = 0usize;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                info!("interrupted");
                return Ok(SUCCESS);
            }
            event = client.next_event() => event,
        };

        match event {
            Some(ClientEvent::MessageArrived(frame)) => {
                if let Some(types) = &args.types {
                    if !types.contains(&frame.kind) {
                        continue;
                    }
                }

                print_frame(&frame, format);
                printed = printed.saturating_add(1);

                if args.count.is_some_and(|count| printed >= count) {
                    return Ok(SUCCESS);
                }
            }
            Some(ClientEvent::ConnectionLost { reason }) => {
                return Err(reason_error("connection lost", &reason));
            }
            Some(ClientEvent::ConnectFailed { reason, .. }) => {
                warn!(%reason, "reconnect failed, retrying");
            }
            Some(ClientEvent::Connected { .. }) => info!("reconnected"),
            Some(other) => debug!(?other, "ignoring event"),
            None => return Err(CliError::new(INTERNAL, "client task stopped")),
        }
    }
}

fn install_ctrlc_handler(cancel: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
