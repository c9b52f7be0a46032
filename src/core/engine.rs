use crate::core::bridge::EventBridge;
use crate::core::log::MessageLog;
use crate::core::sequencer::Sequencer;
use crate::core::session::SessionManager;
use crate::core::transport::ProviderRegistry;
use crate::domain::config::SeqComConfig;
use crate::infrastructure::{serial::SerialProvider, tcp::TcpProvider};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Wires the providers, session, event bridge, message log and sequencer
/// into one component with a single lifetime.
pub struct Engine {
    manager: Arc<SessionManager>,
    log: Arc<MessageLog>,
    sequencer: Arc<Sequencer>,
    bridge: EventBridge,
}

impl Engine {
    /// Engine backed by the real serial and TCP providers.
    pub fn new(config: &SeqComConfig) -> Self {
        let (serial_tx, serial_rx) = mpsc::unbounded_channel();
        let (tcp_tx, tcp_rx) = mpsc::unbounded_channel();

        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(SerialProvider::new(serial_tx)));
        registry.register(Arc::new(TcpProvider::new(tcp_tx, config.link.tcp.timeout_ms)));

        Self::with_registry(registry, serial_rx, tcp_rx, config)
    }

    /// Engine over an injected provider registry; the inbound receivers must
    /// belong to the registered providers' event channels.
    pub fn with_registry(
        registry: ProviderRegistry,
        serial_rx: mpsc::UnboundedReceiver<String>,
        tcp_rx: mpsc::UnboundedReceiver<String>,
        config: &SeqComConfig,
    ) -> Self {
        let log = Arc::new(MessageLog::new(config.log.echo_timestamps));
        let manager = Arc::new(SessionManager::new(registry, Arc::clone(&log), &config.link));
        let bridge = EventBridge::spawn(Arc::clone(&manager), Arc::clone(&log), serial_rx, tcp_rx);
        let sequencer = Arc::new(Sequencer::new(Arc::clone(&manager), config.script.delay_ms));

        info!("engine started in {} mode", config.link.mode);

        Self {
            manager,
            log,
            sequencer,
            bridge,
        }
    }

    pub fn session(&self) -> Arc<SessionManager> {
        Arc::clone(&self.manager)
    }

    pub fn log(&self) -> Arc<MessageLog> {
        Arc::clone(&self.log)
    }

    pub fn sequencer(&self) -> Arc<Sequencer> {
        Arc::clone(&self.sequencer)
    }

    /// Full teardown: best-effort disconnect, then release the bridge.
    pub async fn shutdown(self) {
        if self.manager.is_connected().await {
            let _ = self.manager.disconnect().await;
        }
        self.bridge.shutdown();
        info!("engine stopped");
    }
}
