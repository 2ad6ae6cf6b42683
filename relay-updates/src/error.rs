use thiserror::Error;

/// Result type for polling operations
pub type PollResult<T> = Result<T, PollError>;

/// Why a poll failed - decides whether the stream retries or stops
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// Connectivity, timeouts, overloaded or garbled responses
    #[error("Transient poll failure: {0}")]
    Transient(String),

    /// Bad credentials or a request the endpoint will never accept
    #[error("Fatal poll failure: {0}")]
    Fatal(String),

    /// Transient failures kept coming until the retry budget ran out
    #[error("Poll failed after {attempts} retries: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl PollError {
    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a fatal error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Check if this error is worth another poll
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
