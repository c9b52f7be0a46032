pub mod bridge;
pub mod engine;
pub mod log;
pub mod sequencer;
pub mod session;
pub mod transport;
