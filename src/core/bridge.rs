use crate::core::log::MessageLog;
use crate::core::session::SessionManager;
use crate::domain::config::ConnectionMode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Router between the per-kind inbound channels and the message log.
///
/// Subscribed for the engine's whole lifetime, independent of connection
/// state, so bytes arriving immediately after a connect are never lost.
/// Chunks from a kind other than the session's active mode are dropped:
/// stale data from a just-torn-down transport must not leak into a freshly
/// switched session.
pub struct EventBridge {
    handle: JoinHandle<()>,
}

impl EventBridge {
    pub fn spawn(
        manager: Arc<SessionManager>,
        log: Arc<MessageLog>,
        serial_rx: mpsc::UnboundedReceiver<String>,
        tcp_rx: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let handle = tokio::spawn(Self::pump(manager, log, serial_rx, tcp_rx));
        Self { handle }
    }

    async fn pump(
        manager: Arc<SessionManager>,
        log: Arc<MessageLog>,
        mut serial_rx: mpsc::UnboundedReceiver<String>,
        mut tcp_rx: mpsc::UnboundedReceiver<String>,
    ) {
        let mut serial_open = true;
        let mut tcp_open = true;

        while serial_open || tcp_open {
            let (kind, chunk) = tokio::select! {
                chunk = serial_rx.recv(), if serial_open => match chunk {
                    Some(chunk) => (ConnectionMode::Serial, chunk),
                    None => {
                        serial_open = false;
                        continue;
                    }
                },
                chunk = tcp_rx.recv(), if tcp_open => match chunk {
                    Some(chunk) => (ConnectionMode::Tcp, chunk),
                    None => {
                        tcp_open = false;
                        continue;
                    }
                },
            };

            if manager.mode().await == kind {
                log.append(&normalize_chunk(chunk)).await;
            } else {
                trace!("dropped {} chunk while in {} mode", kind, manager.mode().await);
            }
        }

        debug!("event bridge stopped: all inbound channels closed");
    }

    /// Stop routing. Only called on full engine teardown.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn normalize_chunk(chunk: String) -> String {
    if chunk.ends_with('\n') {
        chunk
    } else {
        format!("{}\n", chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chunk_ensures_trailing_newline() {
        assert_eq!(normalize_chunk("OK".to_string()), "OK\n");
        assert_eq!(normalize_chunk("OK\n".to_string()), "OK\n");
        assert_eq!(normalize_chunk(String::new()), "\n");
    }
}
