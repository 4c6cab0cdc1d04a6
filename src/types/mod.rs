//! Type definitions for liftlog

mod error;
mod mutation;
mod workout;

pub use error::*;
pub use mutation::*;
pub use workout::*;

/// Queue snapshot loading warning types
#[derive(Debug, Clone, PartialEq)]
pub enum QueueWarning {
    /// Failed to open or read the snapshot file
    LoadFailed(String),
    /// Snapshot file was corrupted (invalid JSON)
    Corrupted(String),
    /// Snapshot version mismatch, queue starts empty
    VersionMismatch(String),
}

impl std::fmt::Display for QueueWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueWarning::LoadFailed(msg)
            | QueueWarning::Corrupted(msg)
            | QueueWarning::VersionMismatch(msg) => write!(f, "{}", msg),
        }
    }
}
