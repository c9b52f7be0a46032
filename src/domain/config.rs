use crate::domain::error::{SeqComError, SeqComResult};
use serde::{Deserialize, Serialize};

/// Transport kind of the single active link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Serial,
    Tcp,
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMode::Serial => write!(f, "serial"),
            ConnectionMode::Tcp => write!(f, "tcp"),
        }
    }
}

/// Concrete endpoint a provider connects to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportTarget {
    Serial { port_name: String, baud_rate: u32 },
    Tcp { host: String, port: u16 },
}

impl TransportTarget {
    pub fn mode(&self) -> ConnectionMode {
        match self {
            TransportTarget::Serial { .. } => ConnectionMode::Serial,
            TransportTarget::Tcp { .. } => ConnectionMode::Tcp,
        }
    }

    /// Reject unusable targets before any I/O is attempted.
    pub fn validate(&self) -> SeqComResult<()> {
        match self {
            TransportTarget::Serial { port_name, .. } if port_name.is_empty() => Err(
                SeqComError::Validation("no serial port selected".to_string()),
            ),
            TransportTarget::Tcp { host, .. } if host.is_empty() => Err(SeqComError::Validation(
                "no host address entered".to_string(),
            )),
            TransportTarget::Tcp { port: 0, .. } => {
                Err(SeqComError::Validation("TCP port must be non-zero".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportTarget::Serial { port_name, baud_rate } => {
                write!(f, "{}@{}", port_name, baud_rate)
            }
            TransportTarget::Tcp { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// SeqCom configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeqComConfig {
    /// Link defaults
    #[serde(default)]
    pub link: LinkConfig,
    /// Script sequencer defaults
    #[serde(default)]
    pub script: ScriptConfig,
    /// Message log options
    #[serde(default)]
    pub log: LogConfig,
}

/// Link configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Initial connection mode
    #[serde(default = "default_mode")]
    pub mode: ConnectionMode,
    #[serde(default)]
    pub serial: SerialLinkConfig,
    #[serde(default)]
    pub tcp: TcpLinkConfig,
}

/// Serial link defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialLinkConfig {
    /// Port name; empty selects the first discovered port
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// TCP link defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpLinkConfig {
    #[serde(default = "default_tcp_host")]
    pub host: String,
    #[serde(default = "default_tcp_port")]
    pub port: u16,
    #[serde(default = "default_tcp_timeout")]
    pub timeout_ms: u64,
}

/// Script sequencer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Inter-command delay in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

/// Message log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Prefix sent-command echoes with a timestamp
    #[serde(default)]
    pub echo_timestamps: bool,
}

fn default_mode() -> ConnectionMode {
    ConnectionMode::Serial
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_tcp_host() -> String {
    "192.168.".to_string()
}

fn default_tcp_port() -> u16 {
    5555
}

fn default_tcp_timeout() -> u64 {
    3000
}

impl LinkConfig {
    pub fn serial_target(&self) -> TransportTarget {
        TransportTarget::Serial {
            port_name: self.serial.port.clone(),
            baud_rate: self.serial.baud_rate,
        }
    }

    pub fn tcp_target(&self) -> TransportTarget {
        TransportTarget::Tcp {
            host: self.tcp.host.clone(),
            port: self.tcp.port,
        }
    }

    /// Target for the configured initial mode.
    pub fn initial_target(&self) -> TransportTarget {
        match self.mode {
            ConnectionMode::Serial => self.serial_target(),
            ConnectionMode::Tcp => self.tcp_target(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            serial: SerialLinkConfig::default(),
            tcp: TcpLinkConfig::default(),
        }
    }
}

impl Default for SerialLinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for TcpLinkConfig {
    fn default() -> Self {
        Self {
            host: default_tcp_host(),
            port: default_tcp_port(),
            timeout_ms: default_tcp_timeout(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { delay_ms: 0 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            echo_timestamps: false,
        }
    }
}
