//! Error types for the Directory actor.

use handoff_framework::{FrameworkError, ProtocolViolation};
use thiserror::Error;

/// Errors that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A user with this name is already listed.
    #[error("User already registered: {0}")]
    AlreadyRegistered(String),

    /// The frame broke the lock-handoff protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// A call into another actor failed.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(#[from] FrameworkError),
}
