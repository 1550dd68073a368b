//! Error types for the User actor.

use handoff_framework::{FrameworkError, ProtocolViolation};
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// The user data provided is invalid.
    #[error("User validation error: {0}")]
    ValidationError(String),

    /// The frame broke the lock-handoff protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// A call into another actor failed.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(#[from] FrameworkError),
}
