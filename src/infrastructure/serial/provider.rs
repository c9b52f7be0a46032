use crate::core::transport::{ensure_line_terminator, PortDescriptor, TransportProvider};
use crate::domain::config::{ConnectionMode, TransportTarget};
use crate::domain::error::{SeqComResult, TransportError};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

const READ_BUFFER_SIZE: usize = 1024;
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);
const PORT_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial side of the transport boundary.
///
/// Owns at most one open port. Inbound bytes are polled by a background
/// task and pushed as UTF-8 chunks onto the event channel handed over at
/// construction; the channel outlives any single connection.
pub struct SerialProvider {
    port: Arc<Mutex<Option<Box<dyn SerialPort>>>>,
    events: tokio::sync::mpsc::UnboundedSender<String>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SerialProvider {
    pub fn new(events: tokio::sync::mpsc::UnboundedSender<String>) -> Self {
        Self {
            port: Arc::new(Mutex::new(None)),
            events,
            reader: Mutex::new(None),
        }
    }

    fn spawn_reader(&self) -> tokio::task::JoinHandle<()> {
        let port = Arc::clone(&self.port);
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; READ_BUFFER_SIZE];

            loop {
                tokio::time::sleep(READ_POLL_INTERVAL).await;

                let mut guard = port.lock().await;
                let Some(open_port) = guard.as_mut() else {
                    debug!("serial port closed, stopping read loop");
                    break;
                };

                match open_port.read(&mut buffer) {
                    Ok(0) => continue,
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buffer[..n]).to_string();
                        if events.send(chunk).is_err() {
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                    Err(e) => {
                        error!("serial read failed: {}", e);
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl TransportProvider for SerialProvider {
    fn kind(&self) -> ConnectionMode {
        ConnectionMode::Serial
    }

    async fn list(&self) -> SeqComResult<Vec<PortDescriptor>> {
        let ports = serialport::available_ports().unwrap_or_default();
        Ok(ports
            .into_iter()
            .map(|p| PortDescriptor {
                port_name: p.port_name,
            })
            .collect())
    }

    async fn connect(&self, target: &TransportTarget) -> Result<(), TransportError> {
        let (port_name, baud_rate) = match target {
            TransportTarget::Serial {
                port_name,
                baud_rate,
            } => (port_name, *baud_rate),
            other => return Err(TransportError::TargetUnreachable(other.to_string())),
        };

        let mut guard = self.port.lock().await;
        if guard.is_some() {
            return Err(TransportError::Busy);
        }

        let opened = serialport::new(port_name, baud_rate)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|e| TransportError::TargetUnreachable(format!("{}: {}", port_name, e)))?;

        *guard = Some(opened);
        drop(guard);

        let mut reader = self.reader.lock().await;
        if let Some(old) = reader.take() {
            old.abort();
        }
        *reader = Some(self.spawn_reader());

        info!("serial port {} opened at {} baud", port_name, baud_rate);
        Ok(())
    }

    async fn disconnect(&self, target: &TransportTarget) -> Result<(), TransportError> {
        let closed = self.port.lock().await.take();

        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }

        match closed {
            Some(_) => {
                info!("serial port closed ({})", target);
                Ok(())
            }
            None => Err(TransportError::NotConnected),
        }
    }

    async fn send(&self, _target: &TransportTarget, text: &str) -> Result<(), TransportError> {
        let mut guard = self.port.lock().await;
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let line = ensure_line_terminator(text);
        port.write_all(line.as_bytes()).map_err(map_io_error)?;
        port.flush().map_err(map_io_error)?;

        debug!("serial sent {} bytes", line.len());
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.port.lock().await.is_some()
    }
}

fn map_io_error(e: std::io::Error) -> TransportError {
    match e.kind() {
        std::io::ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::TargetUnreachable(e.to_string()),
    }
}
