use thiserror::Error;

/// liftlog error types
#[derive(Error, Debug)]
pub enum LiftlogError {
    /// Connectivity lost or request timed out; safe to queue and retry
    #[error("network error: {0}")]
    Network(String),

    /// Server refused the request (validation, auth, not found)
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Failed to parse JSON or a database row
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Offline queue persistence failed
    #[error("queue error: {0}")]
    Queue(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Operation needs an in-progress workout
    #[error("no active workout session")]
    NoActiveSession,
}

impl LiftlogError {
    /// Whether this failure is connectivity-class.
    ///
    /// Only these are routed to the offline queue; everything else would
    /// fail the same way on retry.
    pub fn is_network(&self) -> bool {
        matches!(self, LiftlogError::Network(_))
    }

    /// Classify a non-success HTTP status.
    ///
    /// Request and gateway timeouts count as connectivity failures.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 504 => LiftlogError::Network(format!("HTTP {}: {}", status, message)),
            _ => LiftlogError::Rejected { status, message },
        }
    }
}

impl From<serde_json::Error> for LiftlogError {
    fn from(err: serde_json::Error) -> Self {
        LiftlogError::Parse(err.to_string())
    }
}

/// Result type alias for liftlog
pub type Result<T> = std::result::Result<T, LiftlogError>;
