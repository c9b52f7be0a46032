//! SeqCom Library
//!
//! Drives a single serial or TCP connection to an external device and
//! replays indexed command scripts against it: session state machine,
//! inbound event bridge, message log, and the script sequencer with its
//! command builder, batch runner and generation pass.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::engine::Engine;
pub use crate::core::log::{Direction, LogEntry, MessageLog};
pub use crate::core::sequencer::{
    CommandTemplate, GeneratedCommand, RunState, ScriptBuilder, Sequencer,
};
pub use crate::core::session::{LinkState, SessionManager, SessionSnapshot};
pub use crate::core::transport::{PortDescriptor, ProviderRegistry, TransportProvider};
pub use crate::domain::config::{ConnectionMode, SeqComConfig, TransportTarget};
pub use crate::domain::error::{SeqComError, SeqComResult, TransportError};
