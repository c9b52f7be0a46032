use crate::core::log::MessageLog;
use crate::core::session::state::{LinkState, Session, SessionSnapshot};
use crate::core::transport::{PortDescriptor, ProviderRegistry, TransportProvider};
use crate::domain::config::{ConnectionMode, LinkConfig, TransportTarget};
use crate::domain::error::{SeqComError, SeqComResult, TransportError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Owner of the single active connection.
///
/// All mutation goes through this type; the per-mode target selections
/// survive mode switches so toggling back restores the previous endpoint.
pub struct SessionManager {
    session: RwLock<Session>,
    registry: ProviderRegistry,
    serial_target: RwLock<TransportTarget>,
    tcp_target: RwLock<TransportTarget>,
    ports: RwLock<Vec<PortDescriptor>>,
    log: Arc<MessageLog>,
}

impl SessionManager {
    pub fn new(registry: ProviderRegistry, log: Arc<MessageLog>, link: &LinkConfig) -> Self {
        Self {
            session: RwLock::new(Session::new(link.mode, link.initial_target())),
            registry,
            serial_target: RwLock::new(link.serial_target()),
            tcp_target: RwLock::new(link.tcp_target()),
            ports: RwLock::new(Vec::new()),
            log,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.read().await.snapshot()
    }

    pub async fn mode(&self) -> ConnectionMode {
        self.session.read().await.mode
    }

    pub async fn state(&self) -> LinkState {
        self.session.read().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_connected()
    }

    pub async fn ports(&self) -> Vec<PortDescriptor> {
        self.ports.read().await.clone()
    }

    /// Attempt to connect the session's current target.
    ///
    /// Requires `Disconnected`; the `Connecting` state is itself the guard
    /// against a second attempt in flight. Failure returns the session to
    /// `Disconnected` with the error recorded. No implicit retry.
    pub async fn connect(&self) -> SeqComResult<()> {
        let (kind, target) = {
            let mut session = self.session.write().await;

            if session.state != LinkState::Disconnected {
                return Err(SeqComError::Precondition(format!(
                    "connect requires a disconnected session (currently {})",
                    session.state
                )));
            }

            let target = self.stored_target(session.mode).await;
            target.validate()?;

            session.target = target.clone();
            session.transition(LinkState::Connecting)?;
            session.last_error = None;
            (session.mode, target)
        };

        let provider = self.provider(kind)?;
        match provider.connect(&target).await {
            Ok(()) => {
                let mut session = self.session.write().await;
                session.transition(LinkState::Connected)?;
                info!("connected to {} over {}", target, kind);
                Ok(())
            }
            Err(e) => {
                let mut session = self.session.write().await;
                session.transition(LinkState::Disconnected)?;
                session.last_error = Some(e.to_string());
                warn!("connect to {} failed: {}", target, e);
                Err(e.into())
            }
        }
    }

    /// Tear the connection down.
    ///
    /// Best-effort: the session always lands on `Disconnected`, even when
    /// the provider call fails; the failure is still recorded and returned.
    pub async fn disconnect(&self) -> SeqComResult<()> {
        let (kind, target) = {
            let mut session = self.session.write().await;

            match session.state {
                LinkState::Disconnected => return Ok(()),
                LinkState::Connected => session.transition(LinkState::Disconnecting)?,
                other => {
                    return Err(SeqComError::Precondition(format!(
                        "disconnect while {}",
                        other
                    )))
                }
            }

            (session.mode, session.target.clone())
        };

        let provider = self.provider(kind)?;
        let result = provider.disconnect(&target).await;

        {
            let mut session = self.session.write().await;
            session.transition(LinkState::Disconnected)?;
            if let Err(e) = &result {
                session.last_error = Some(e.to_string());
            }
        }

        match result {
            Ok(()) => {
                info!("disconnected from {}", target);
                Ok(())
            }
            Err(e) => {
                warn!("disconnect from {} failed: {}", target, e);
                Err(e.into())
            }
        }
    }

    /// Switch between serial and TCP.
    ///
    /// While connected this first disconnects the current target; the new
    /// mode is applied even when that teardown fails. The session record is
    /// rebuilt from scratch and left disconnected: switching never
    /// auto-connects.
    pub async fn switch_mode(&self, mode: ConnectionMode) -> SeqComResult<()> {
        {
            let session = self.session.read().await;
            if session.mode == mode {
                return Ok(());
            }
            if matches!(session.state, LinkState::Connecting | LinkState::Disconnecting) {
                return Err(SeqComError::Precondition(format!(
                    "mode switch while {}",
                    session.state
                )));
            }
        }

        if self.is_connected().await {
            if let Err(e) = self.disconnect().await {
                warn!("mode switch: teardown of previous target failed: {}", e);
            }
        }

        let target = self.stored_target(mode).await;
        {
            let mut session = self.session.write().await;
            *session = Session::new(mode, target);
        }

        debug!("mode switched to {}", mode);
        Ok(())
    }

    /// Change the serial port selection.
    ///
    /// While connected this is a same-mode reconnect: the old target must
    /// come down first, and a failed teardown rejects the change so the
    /// prior selection stays in place. An explicit connect follows.
    pub async fn select_port(&self, port_name: &str) -> SeqComResult<()> {
        {
            let session = self.session.read().await;
            if session.mode != ConnectionMode::Serial {
                return Err(SeqComError::Precondition(
                    "port selection applies to serial mode".to_string(),
                ));
            }
            if matches!(session.state, LinkState::Connecting | LinkState::Disconnecting) {
                return Err(SeqComError::Precondition(format!(
                    "port change while {}",
                    session.state
                )));
            }
        }

        let baud_rate = match &*self.serial_target.read().await {
            TransportTarget::Serial {
                port_name: current,
                baud_rate,
            } => {
                if current == port_name {
                    return Ok(());
                }
                *baud_rate
            }
            _ => crate::domain::config::SerialLinkConfig::default().baud_rate,
        };

        if self.is_connected().await {
            self.disconnect().await?;
        }

        let target = TransportTarget::Serial {
            port_name: port_name.to_string(),
            baud_rate,
        };
        *self.serial_target.write().await = target.clone();

        let mut session = self.session.write().await;
        if session.mode == ConnectionMode::Serial {
            session.target = target;
        }

        Ok(())
    }

    /// Update the serial baud rate; takes effect on the next connect.
    pub async fn set_baud_rate(&self, baud_rate: u32) -> SeqComResult<()> {
        // Lock order: session before target selections, as in connect()
        let mut session = self.session.write().await;
        let mut stored = self.serial_target.write().await;

        if let TransportTarget::Serial { port_name, .. } = &*stored {
            *stored = TransportTarget::Serial {
                port_name: port_name.clone(),
                baud_rate,
            };
        }

        if session.mode == ConnectionMode::Serial && session.state == LinkState::Disconnected {
            session.target = stored.clone();
        }
        Ok(())
    }

    /// Update the TCP endpoint; takes effect on the next connect.
    pub async fn set_tcp_endpoint(&self, host: &str, port: u16) -> SeqComResult<()> {
        let target = TransportTarget::Tcp {
            host: host.to_string(),
            port,
        };
        *self.tcp_target.write().await = target.clone();

        let mut session = self.session.write().await;
        if session.mode == ConnectionMode::Tcp && session.state == LinkState::Disconnected {
            session.target = target;
        }
        Ok(())
    }

    /// Rescan serial ports, auto-selecting the first when none is selected.
    pub async fn refresh_ports(&self) -> SeqComResult<Vec<PortDescriptor>> {
        let provider = self.provider(ConnectionMode::Serial)?;
        let discovered = provider.list().await?;

        *self.ports.write().await = discovered.clone();

        let auto_selected = {
            let mut stored = self.serial_target.write().await;
            let replacement = match &*stored {
                TransportTarget::Serial {
                    port_name,
                    baud_rate,
                } if port_name.is_empty() => {
                    discovered.first().map(|first| TransportTarget::Serial {
                        port_name: first.port_name.clone(),
                        baud_rate: *baud_rate,
                    })
                }
                _ => None,
            };

            if let Some(target) = &replacement {
                *stored = target.clone();
            }
            replacement
        };

        if let Some(target) = auto_selected {
            debug!("auto-selected serial port {}", target);
            let mut session = self.session.write().await;
            if session.mode == ConnectionMode::Serial && session.state == LinkState::Disconnected {
                session.target = target;
            }
        }

        Ok(discovered)
    }

    /// Probe whether the link is actually alive.
    ///
    /// Holds the orthogonal `checking` flag for the probe's duration. A dead
    /// probe on a nominally connected session forces the teardown path.
    pub async fn check_connection(&self) -> SeqComResult<bool> {
        let kind = {
            let mut session = self.session.write().await;
            session.checking = true;
            session.mode
        };

        let alive = match self.provider(kind) {
            Ok(provider) => provider.is_connected().await,
            Err(e) => {
                self.session.write().await.checking = false;
                return Err(e);
            }
        };

        {
            let mut session = self.session.write().await;
            session.checking = false;
            if !alive && session.state == LinkState::Connected {
                session.transition(LinkState::Disconnecting)?;
                session.transition(LinkState::Disconnected)?;
                session.last_error = Some("connection lost".to_string());
            }
        }

        Ok(alive)
    }

    /// Send one line of text over the active connection.
    ///
    /// The `sending` flag is held for exactly this call's duration and is
    /// the mutual-exclusion signal between the sequencer and direct sends.
    /// A successful send is echoed into the message log.
    pub async fn send(&self, text: &str) -> SeqComResult<()> {
        let (kind, target) = {
            let mut session = self.session.write().await;

            if session.state != LinkState::Connected {
                return Err(SeqComError::Precondition(
                    "send requires a connected session".to_string(),
                ));
            }
            if session.sending {
                return Err(TransportError::Busy.into());
            }

            session.sending = true;
            (session.mode, session.target.clone())
        };

        let provider = match self.provider(kind) {
            Ok(provider) => provider,
            Err(e) => {
                self.session.write().await.sending = false;
                return Err(e);
            }
        };
        let result = provider.send(&target, text).await;

        {
            let mut session = self.session.write().await;
            session.sending = false;
            if let Err(e) = &result {
                session.last_error = Some(e.to_string());
            }
        }

        match result {
            Ok(()) => {
                self.log.append_echo(text).await;
                debug!("sent '{}' to {}", text, target);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // Private methods

    async fn stored_target(&self, mode: ConnectionMode) -> TransportTarget {
        match mode {
            ConnectionMode::Serial => self.serial_target.read().await.clone(),
            ConnectionMode::Tcp => self.tcp_target.read().await.clone(),
        }
    }

    fn provider(&self, kind: ConnectionMode) -> SeqComResult<Arc<dyn TransportProvider>> {
        self.registry.get(kind).ok_or_else(|| SeqComError::Config {
            message: format!("no provider registered for {} transport", kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::ensure_line_terminator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Provider that records its calls and fails on demand.
    struct MockProvider {
        kind: ConnectionMode,
        fail_connect: AtomicBool,
        fail_disconnect: AtomicBool,
        fail_send: AtomicBool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockProvider {
        fn new(kind: ConnectionMode, calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                kind,
                fail_connect: AtomicBool::new(false),
                fail_disconnect: AtomicBool::new(false),
                fail_send: AtomicBool::new(false),
                calls,
            }
        }

        fn record(&self, entry: String) {
            self.calls.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl TransportProvider for MockProvider {
        fn kind(&self) -> ConnectionMode {
            self.kind
        }

        async fn list(&self) -> SeqComResult<Vec<PortDescriptor>> {
            Ok(vec![
                PortDescriptor {
                    port_name: "COM3".to_string(),
                },
                PortDescriptor {
                    port_name: "COM7".to_string(),
                },
            ])
        }

        async fn connect(&self, target: &TransportTarget) -> Result<(), TransportError> {
            self.record(format!("{}:connect:{}", self.kind, target));
            if self.fail_connect.load(Ordering::SeqCst) {
                return Err(TransportError::TargetUnreachable(target.to_string()));
            }
            Ok(())
        }

        async fn disconnect(&self, target: &TransportTarget) -> Result<(), TransportError> {
            self.record(format!("{}:disconnect:{}", self.kind, target));
            if self.fail_disconnect.load(Ordering::SeqCst) {
                return Err(TransportError::NotConnected);
            }
            Ok(())
        }

        async fn send(&self, target: &TransportTarget, text: &str) -> Result<(), TransportError> {
            self.record(format!("{}:send:{}", self.kind, ensure_line_terminator(text)));
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(TransportError::TargetUnreachable(target.to_string()));
            }
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    struct Fixture {
        manager: SessionManager,
        log: Arc<MessageLog>,
        calls: Arc<Mutex<Vec<String>>>,
        serial: Arc<MockProvider>,
    }

    fn create_fixture() -> Fixture {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let serial = Arc::new(MockProvider::new(ConnectionMode::Serial, Arc::clone(&calls)));
        let tcp = Arc::new(MockProvider::new(ConnectionMode::Tcp, Arc::clone(&calls)));

        let mut registry = ProviderRegistry::new();
        registry.register(Arc::clone(&serial) as Arc<dyn TransportProvider>);
        registry.register(tcp as Arc<dyn TransportProvider>);

        let log = Arc::new(MessageLog::new(false));
        let mut link = LinkConfig::default();
        link.serial.port = "COM3".to_string();
        link.tcp.host = "192.168.1.50".to_string();

        Fixture {
            manager: SessionManager::new(registry, Arc::clone(&log), &link),
            log,
            calls,
            serial,
        }
    }

    #[tokio::test]
    async fn test_connect_success_and_snapshot() {
        let fx = create_fixture();

        assert!(!fx.manager.is_connected().await);
        fx.manager.connect().await.unwrap();

        let snapshot = fx.manager.snapshot().await;
        assert!(snapshot.connected);
        assert_eq!(snapshot.mode, ConnectionMode::Serial);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        let fx = create_fixture();
        fx.serial.fail_connect.store(true, Ordering::SeqCst);

        let result = fx.manager.connect().await;
        assert!(result.is_err());

        let snapshot = fx.manager.snapshot().await;
        assert!(!snapshot.connected);
        assert!(snapshot.last_error.unwrap().contains("unreachable"));

        // No retry happened
        assert_eq!(fx.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_requires_disconnected() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();

        let result = fx.manager.connect().await;
        assert!(matches!(result, Err(SeqComError::Precondition(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_port_without_state_change() {
        let fx = create_fixture();
        fx.manager.select_port("").await.unwrap();

        let result = fx.manager.connect().await;
        assert!(matches!(result, Err(SeqComError::Validation(_))));
        assert_eq!(fx.manager.state().await, LinkState::Disconnected);
        assert!(fx.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_lands_disconnected_even_on_provider_failure() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();
        fx.serial.fail_disconnect.store(true, Ordering::SeqCst);

        let result = fx.manager.disconnect().await;
        assert!(result.is_err());
        assert_eq!(fx.manager.state().await, LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_when_already_disconnected_is_noop() {
        let fx = create_fixture();
        assert!(fx.manager.disconnect().await.is_ok());
        assert!(fx.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mode_switch_disconnects_old_target_first() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();

        fx.manager.switch_mode(ConnectionMode::Tcp).await.unwrap();

        let calls = fx.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].starts_with("serial:disconnect:COM3"));

        let snapshot = fx.manager.snapshot().await;
        assert_eq!(snapshot.mode, ConnectionMode::Tcp);
        // Switching never auto-connects
        assert!(!snapshot.connected);
    }

    #[tokio::test]
    async fn test_mode_switch_applies_even_when_disconnect_fails() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();
        fx.serial.fail_disconnect.store(true, Ordering::SeqCst);

        fx.manager.switch_mode(ConnectionMode::Tcp).await.unwrap();

        assert_eq!(fx.manager.mode().await, ConnectionMode::Tcp);
        assert!(!fx.manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_mode_switch_to_same_mode_is_noop() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();

        fx.manager.switch_mode(ConnectionMode::Serial).await.unwrap();
        assert!(fx.manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_port_change_rejected_when_disconnect_fails() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();
        fx.serial.fail_disconnect.store(true, Ordering::SeqCst);

        let result = fx.manager.select_port("COM7").await;
        assert!(result.is_err());

        // Prior selection retained
        let session = fx.manager.session.read().await;
        assert!(matches!(
            &session.target,
            TransportTarget::Serial { port_name, .. } if port_name == "COM3"
        ));
    }

    #[tokio::test]
    async fn test_port_change_while_connected_disconnects_old_target() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();

        fx.manager.select_port("COM7").await.unwrap();

        let calls = fx.calls.lock().unwrap().clone();
        assert!(calls[1].starts_with("serial:disconnect:COM3"));
        assert!(!fx.manager.is_connected().await);

        // Explicit reconnect picks up the new selection
        fx.manager.connect().await.unwrap();
        let calls = fx.calls.lock().unwrap().clone();
        assert!(calls[2].starts_with("serial:connect:COM7"));
    }

    #[tokio::test]
    async fn test_refresh_ports_auto_selects_first() {
        let fx = create_fixture();
        fx.manager.select_port("").await.unwrap();

        let ports = fx.manager.refresh_ports().await.unwrap();
        assert_eq!(ports.len(), 2);

        let session = fx.manager.session.read().await;
        assert!(matches!(
            &session.target,
            TransportTarget::Serial { port_name, .. } if port_name == "COM3"
        ));
    }

    #[tokio::test]
    async fn test_send_requires_connected() {
        let fx = create_fixture();

        let result = fx.manager.send(":info 99").await;
        assert!(matches!(result, Err(SeqComError::Precondition(_))));
        assert!(fx.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_echoes_into_message_log() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();

        fx.manager.send(":info 99").await.unwrap();

        assert_eq!(fx.log.text().await, "> :info 99\n");
        assert!(!fx.manager.snapshot().await.sending);
    }

    #[tokio::test]
    async fn test_failed_send_is_not_echoed() {
        let fx = create_fixture();
        fx.manager.connect().await.unwrap();
        fx.serial.fail_send.store(true, Ordering::SeqCst);

        let result = fx.manager.send(":info 99").await;
        assert!(result.is_err());
        assert!(fx.log.is_empty().await);
        assert!(fx.manager.snapshot().await.last_error.is_some());
    }

    #[tokio::test]
    async fn test_tcp_endpoint_update_applies_on_next_connect() {
        let fx = create_fixture();
        fx.manager.switch_mode(ConnectionMode::Tcp).await.unwrap();
        fx.manager.set_tcp_endpoint("10.0.0.9", 4000).await.unwrap();

        fx.manager.connect().await.unwrap();

        let calls = fx.calls.lock().unwrap().clone();
        assert!(calls[0].starts_with("tcp:connect:10.0.0.9:4000"));
    }
}
