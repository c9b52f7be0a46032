use async_trait::async_trait;
use seqcom::core::session::SessionManager;
use seqcom::core::transport::ProviderRegistry;
use seqcom::{
    ConnectionMode, Engine, MessageLog, PortDescriptor, SeqComConfig, SeqComResult,
    TransportError, TransportProvider, TransportTarget,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Call-recording provider shared by both transport kinds in these tests.
struct ScriptedProvider {
    kind: ConnectionMode,
    fail_disconnect: AtomicBool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    fn new(kind: ConnectionMode, calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            kind,
            fail_disconnect: AtomicBool::new(false),
            calls,
        }
    }
}

#[async_trait]
impl TransportProvider for ScriptedProvider {
    fn kind(&self) -> ConnectionMode {
        self.kind
    }

    async fn list(&self) -> SeqComResult<Vec<PortDescriptor>> {
        Ok(vec![PortDescriptor {
            port_name: "COM3".to_string(),
        }])
    }

    async fn connect(&self, target: &TransportTarget) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:connect:{}", self.kind, target));
        Ok(())
    }

    async fn disconnect(&self, target: &TransportTarget) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:disconnect:{}", self.kind, target));
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    async fn send(&self, _target: &TransportTarget, text: &str) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:send:{}", self.kind, text));
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

struct Fixture {
    manager: Arc<SessionManager>,
    calls: Arc<Mutex<Vec<String>>>,
    serial: Arc<ScriptedProvider>,
}

fn create_fixture() -> Fixture {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let serial = Arc::new(ScriptedProvider::new(
        ConnectionMode::Serial,
        Arc::clone(&calls),
    ));
    let tcp = Arc::new(ScriptedProvider::new(ConnectionMode::Tcp, Arc::clone(&calls)));

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&serial) as Arc<dyn TransportProvider>);
    registry.register(tcp as Arc<dyn TransportProvider>);

    let mut link = seqcom::domain::config::LinkConfig::default();
    link.serial.port = "COM3".to_string();
    link.tcp.host = "192.168.1.50".to_string();

    let log = Arc::new(MessageLog::new(false));
    Fixture {
        manager: Arc::new(SessionManager::new(registry, log, &link)),
        calls,
        serial,
    }
}

#[tokio::test]
async fn test_connected_iff_last_terminal_transition_was_successful_connect() {
    let fx = create_fixture();

    assert!(!fx.manager.is_connected().await);

    fx.manager.connect().await.unwrap();
    assert!(fx.manager.is_connected().await);

    fx.manager.disconnect().await.unwrap();
    assert!(!fx.manager.is_connected().await);

    fx.manager.connect().await.unwrap();
    assert!(fx.manager.is_connected().await);

    // A failed disconnect is still terminal: connected must read false
    fx.serial.fail_disconnect.store(true, Ordering::SeqCst);
    let _ = fx.manager.disconnect().await;
    assert!(!fx.manager.is_connected().await);
}

#[tokio::test]
async fn test_mode_switch_issues_exactly_one_disconnect_before_mode_change() {
    let fx = create_fixture();
    fx.manager.connect().await.unwrap();
    fx.calls.lock().unwrap().clear();

    fx.manager.switch_mode(ConnectionMode::Tcp).await.unwrap();

    let calls = fx.calls.lock().unwrap().clone();
    let disconnects: Vec<_> = calls.iter().filter(|c| c.contains(":disconnect:")).collect();
    assert_eq!(disconnects.len(), 1);
    assert!(disconnects[0].starts_with("serial:"), "{}", disconnects[0]);

    assert_eq!(fx.manager.mode().await, ConnectionMode::Tcp);
    assert!(!fx.manager.is_connected().await);
}

#[tokio::test]
async fn test_mode_switch_applies_new_mode_even_when_disconnect_fails() {
    let fx = create_fixture();
    fx.manager.connect().await.unwrap();
    fx.serial.fail_disconnect.store(true, Ordering::SeqCst);

    fx.manager.switch_mode(ConnectionMode::Tcp).await.unwrap();

    assert_eq!(fx.manager.mode().await, ConnectionMode::Tcp);

    let calls = fx.calls.lock().unwrap().clone();
    assert!(calls.iter().any(|c| c.starts_with("serial:disconnect:")));
}

#[tokio::test]
async fn test_switch_back_restores_previous_endpoint() {
    let fx = create_fixture();

    fx.manager.switch_mode(ConnectionMode::Tcp).await.unwrap();
    fx.manager.switch_mode(ConnectionMode::Serial).await.unwrap();
    fx.manager.connect().await.unwrap();

    let calls = fx.calls.lock().unwrap().clone();
    assert!(calls[0].starts_with("serial:connect:COM3"));
}

#[tokio::test]
async fn test_send_only_permitted_while_connected() {
    let fx = create_fixture();

    assert!(fx.manager.send(":info 99").await.is_err());

    fx.manager.connect().await.unwrap();
    fx.manager.send(":info 99").await.unwrap();

    let calls = fx.calls.lock().unwrap().clone();
    assert!(calls.iter().any(|c| c == "serial:send::info 99"));
}

// Bridge behavior through the engine facade

struct SilentProvider {
    kind: ConnectionMode,
}

#[async_trait]
impl TransportProvider for SilentProvider {
    fn kind(&self) -> ConnectionMode {
        self.kind
    }

    async fn list(&self) -> SeqComResult<Vec<PortDescriptor>> {
        Ok(Vec::new())
    }

    async fn connect(&self, _target: &TransportTarget) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self, _target: &TransportTarget) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, _target: &TransportTarget, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

fn create_engine() -> (
    Engine,
    mpsc::UnboundedSender<String>,
    mpsc::UnboundedSender<String>,
) {
    let (serial_tx, serial_rx) = mpsc::unbounded_channel();
    let (tcp_tx, tcp_rx) = mpsc::unbounded_channel();

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(SilentProvider {
        kind: ConnectionMode::Serial,
    }));
    registry.register(Arc::new(SilentProvider {
        kind: ConnectionMode::Tcp,
    }));

    let mut config = SeqComConfig::default();
    config.link.serial.port = "COM3".to_string();

    let engine = Engine::with_registry(registry, serial_rx, tcp_rx, &config);
    (engine, serial_tx, tcp_tx)
}

#[tokio::test]
async fn test_inbound_chunk_of_wrong_kind_never_reaches_the_log() {
    let (engine, serial_tx, tcp_tx) = create_engine();

    // Session is in serial mode; a stale TCP chunk must be dropped
    tcp_tx.send("stale tcp data".to_string()).unwrap();
    serial_tx.send("serial data".to_string()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let text = engine.log().text().await;
    assert_eq!(text, "serial data\n");
    assert!(!text.contains("stale"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_bridge_receives_while_disconnected_and_normalizes_endings() {
    let (engine, serial_tx, _tcp_tx) = create_engine();

    // No connect has happened, the bridge is live regardless
    serial_tx.send("early banner".to_string()).unwrap();
    serial_tx.send("line with ending\n".to_string()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.log().text().await, "early banner\nline with ending\n");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_bridge_follows_mode_switches() {
    let (engine, serial_tx, tcp_tx) = create_engine();

    engine
        .session()
        .set_tcp_endpoint("192.168.1.50", 5555)
        .await
        .unwrap();
    engine.session().switch_mode(ConnectionMode::Tcp).await.unwrap();

    serial_tx.send("now stale serial".to_string()).unwrap();
    tcp_tx.send("fresh tcp".to_string()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.log().text().await, "fresh tcp\n");

    engine.shutdown().await;
}
