pub mod builder;
pub mod runner;

pub use builder::{generate, CommandTemplate, GeneratedCommand, ScriptBuilder};
pub use runner::{RunState, Sequencer};
