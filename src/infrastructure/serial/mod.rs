mod provider;

pub use provider::SerialProvider;
