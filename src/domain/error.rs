use thiserror::Error;

/// Failures reported by a transport provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("target unreachable: {0}")]
    TargetUnreachable(String),

    #[error("communication timeout")]
    Timeout,

    #[error("transport busy")]
    Busy,
}

/// SeqCom unified error type
#[derive(Error, Debug)]
pub enum SeqComError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("script I/O error: {0}")]
    ScriptIo(#[from] std::io::Error),

    #[error("output error: {0}")]
    Output(String),
}

pub type SeqComResult<T> = Result<T, SeqComError>;

impl SeqComError {
    /// True for errors that reject an operation before any I/O is attempted.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SeqComError::Validation(_) | SeqComError::Precondition(_))
    }
}
