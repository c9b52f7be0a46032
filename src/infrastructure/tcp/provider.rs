use crate::core::transport::{ensure_line_terminator, PortDescriptor, TransportProvider};
use crate::domain::config::{ConnectionMode, TransportTarget};
use crate::domain::error::{SeqComResult, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const READ_BUFFER_SIZE: usize = 4096;
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// TCP side of the transport boundary.
///
/// Owns at most one open stream. A background task polls for inbound bytes
/// and pushes UTF-8 chunks onto the event channel handed over at
/// construction; the channel outlives any single connection.
pub struct TcpProvider {
    stream: Arc<Mutex<Option<TcpStream>>>,
    events: tokio::sync::mpsc::UnboundedSender<String>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
    connect_timeout: Duration,
}

impl TcpProvider {
    pub fn new(events: tokio::sync::mpsc::UnboundedSender<String>, connect_timeout_ms: u64) -> Self {
        Self {
            stream: Arc::new(Mutex::new(None)),
            events,
            reader: Mutex::new(None),
            connect_timeout: Duration::from_millis(connect_timeout_ms),
        }
    }

    fn spawn_reader(&self) -> tokio::task::JoinHandle<()> {
        let stream = Arc::clone(&self.stream);
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; READ_BUFFER_SIZE];

            loop {
                let mut guard = stream.lock().await;
                let Some(open_stream) = guard.as_mut() else {
                    debug!("TCP stream closed, stopping read loop");
                    break;
                };

                match tokio::time::timeout(READ_POLL_TIMEOUT, open_stream.read(&mut buffer)).await {
                    Ok(Ok(0)) => {
                        info!("TCP connection closed by peer");
                        *guard = None;
                        break;
                    }
                    Ok(Ok(n)) => {
                        let chunk = String::from_utf8_lossy(&buffer[..n]).to_string();
                        if events.send(chunk).is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        error!("TCP read failed: {}", e);
                        break;
                    }
                    Err(_) => {
                        // Poll window elapsed; release the lock so sends interleave
                        drop(guard);
                        tokio::task::yield_now().await;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl TransportProvider for TcpProvider {
    fn kind(&self) -> ConnectionMode {
        ConnectionMode::Tcp
    }

    async fn list(&self) -> SeqComResult<Vec<PortDescriptor>> {
        // TCP endpoints are entered, not discovered
        Ok(Vec::new())
    }

    async fn connect(&self, target: &TransportTarget) -> Result<(), TransportError> {
        let (host, port) = match target {
            TransportTarget::Tcp { host, port } => (host.clone(), *port),
            other => return Err(TransportError::TargetUnreachable(other.to_string())),
        };

        let mut guard = self.stream.lock().await;
        if guard.is_some() {
            return Err(TransportError::Busy);
        }

        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((host.as_str(), port)),
        )
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::TargetUnreachable(format!("{}:{}: {}", host, port, e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {}", e);
        }

        *guard = Some(stream);
        drop(guard);

        let mut reader = self.reader.lock().await;
        if let Some(old) = reader.take() {
            old.abort();
        }
        *reader = Some(self.spawn_reader());

        info!("TCP connection established to {}:{}", host, port);
        Ok(())
    }

    async fn disconnect(&self, target: &TransportTarget) -> Result<(), TransportError> {
        let closed = self.stream.lock().await.take();

        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }

        match closed {
            Some(mut stream) => {
                if let Err(e) = stream.shutdown().await {
                    warn!("TCP shutdown failed: {}", e);
                }
                info!("TCP connection closed ({})", target);
                Ok(())
            }
            None => Err(TransportError::NotConnected),
        }
    }

    async fn send(&self, _target: &TransportTarget, text: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let line = ensure_line_terminator(text);
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(map_io_error)?;
        stream.flush().await.map_err(map_io_error)?;

        debug!("TCP sent {} bytes", line.len());
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }
}

fn map_io_error(e: std::io::Error) -> TransportError {
    match e.kind() {
        std::io::ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::TargetUnreachable(e.to_string()),
    }
}
