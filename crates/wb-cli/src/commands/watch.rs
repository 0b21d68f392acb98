//! Stream broadcast events from the application

use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use wb_client::BridgeCommands;

use crate::output::print_json_line;

/// Execute the watch command
///
/// Prints one JSON line per broadcast frame until interrupted, or until
/// `limit` frames have been printed. Fails once the connection is lost
/// and reconnection has given up.
pub async fn watch_command(commands: &BridgeCommands, limit: Option<usize>) -> Result<()> {
    let mut events = commands.subscribe()?;
    let mut printed = 0usize;
    let mut liveness = tokio::time::interval(Duration::from_secs(1));

    loop {
        if limit.is_some_and(|max| printed >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted, stopping watch");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    print_json_line(event.raw())?;
                    printed += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = liveness.tick() => {
                if commands.connection_lost() {
                    anyhow::bail!("Connection to the app was lost after {} events", printed);
                }
            }
        }
    }

    Ok(())
}
