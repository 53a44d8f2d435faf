//! Unix socket transport.
//!
//! Each connection carries newline-delimited JSON: one [`AgentRequest`] per
//! line in, one [`Decision`](crate::decision::Decision) per line out.

use crate::agent::{AgentRequest, BadBotAgent};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Longest request line accepted, in bytes. Longer lines get an error reply
/// and are discarded up to the next newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Reply for a line that could not be decoded.
#[derive(Debug, Serialize)]
struct ErrorReply {
    error: String,
}

/// Bind a Unix socket, replacing a stale socket file if present.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path)
}

/// Accept connections until `shutdown` resolves.
///
/// Accept errors are logged and retried after a short pause; they never stop
/// the listener.
pub async fn serve<F>(listener: UnixListener, agent: Arc<BadBotAgent>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                let agent = agent.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, agent).await {
                        warn!(error = %e, "Connection closed with error");
                    }
                });
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, agent: Arc<BadBotAgent>) -> std::io::Result<()> {
    debug!("Connection accepted");
    let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    while let Some(line) = lines.next().await {
        let reply = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => reply_to(&agent, &line),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                debug!(max = MAX_LINE_BYTES, "Request line too long");
                error_reply(format!("request line exceeds {} bytes", MAX_LINE_BYTES))
            }
            Err(LinesCodecError::Io(e)) => return Err(e),
        }?;

        lines.send(reply).await.map_err(codec_error)?;
    }

    debug!("Connection finished");
    Ok(())
}

fn reply_to(agent: &BadBotAgent, line: &str) -> std::io::Result<String> {
    match serde_json::from_str::<AgentRequest>(line) {
        Ok(request) => serde_json::to_string(&agent.on_request(&request)).map_err(std::io::Error::other),
        Err(e) => {
            debug!(error = %e, "Malformed request line");
            error_reply(format!("invalid request: {}", e))
        }
    }
}

fn error_reply(error: String) -> std::io::Result<String> {
    serde_json::to_string(&ErrorReply { error }).map_err(std::io::Error::other)
}

fn codec_error(e: LinesCodecError) -> std::io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        other => std::io::Error::other(other),
    }
}
