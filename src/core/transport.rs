use crate::domain::config::{ConnectionMode, TransportTarget};
use crate::domain::error::{SeqComResult, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Descriptor of a discoverable endpoint (serial ports only; TCP has none)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub port_name: String,
}

/// Capability set a transport provider exposes to the session layer.
///
/// Outbound responses never come back from `send`; they arrive later as raw
/// chunks on the provider's inbound event channel, handed over at
/// construction time and kept open for the provider's full lifetime.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    fn kind(&self) -> ConnectionMode;

    /// Discoverable endpoints in provider order.
    async fn list(&self) -> SeqComResult<Vec<PortDescriptor>>;

    async fn connect(&self, target: &TransportTarget) -> Result<(), TransportError>;

    async fn disconnect(&self, target: &TransportTarget) -> Result<(), TransportError>;

    /// Fire-and-forget write; implementations terminate the line if the text
    /// carries no trailing newline.
    async fn send(&self, target: &TransportTarget, text: &str) -> Result<(), TransportError>;

    /// Liveness probe for the `checking` flag.
    async fn is_connected(&self) -> bool;
}

/// Ensure the outgoing text ends in a line terminator the device recognizes.
pub fn ensure_line_terminator(text: &str) -> Cow<'_, str> {
    if text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}\r\n", text))
    }
}

/// Registry holding one provider per transport kind
pub struct ProviderRegistry {
    providers: HashMap<ConnectionMode, Arc<dyn TransportProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn TransportProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ConnectionMode) -> Option<Arc<dyn TransportProvider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ConnectionMode> {
        self.providers.keys().copied().collect()
    }

    pub fn has(&self, kind: ConnectionMode) -> bool {
        self.providers.contains_key(&kind)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
