//! # Framework Errors
//!
//! Two kinds of failure travel through the runtime:
//!
//! - [`ProtocolViolation`]: the lock-handoff discipline was broken (a lock released twice,
//!   a result published twice, ...). These are fatal for the frame they happen in. The
//!   context records the first one, logs it, and the frame's [`Future`](crate::Future)
//!   resolves to [`FrameworkError::Protocol`] instead of the operation's value.
//! - Everything else an operation can report, collected in [`FrameworkError`] and handed
//!   to the caller through the Future.

/// Breaches of the lock-handoff protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("released a lock the frame does not hold")]
    ReleaseWithoutHold,
    #[error("reacquired a lock that was not released")]
    RelockWithoutRelease,
    #[error("frame finished while a nested call still owed it a relock")]
    UnpairedRelease,
    #[error("frame is already closed")]
    FrameClosed,
    #[error("result published twice")]
    DoublePublish,
    #[error("result taken twice")]
    DoubleTake,
    #[error("actor state accessed without holding its lock")]
    StateNotHeld,
    #[error("actor state is not a `{0}`")]
    StateMismatch(&'static str),
}

/// Errors delivered through a [`Future`](crate::Future).
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// The wrapped operation returned an error.
    #[error("Operation failed: {0}")]
    Implementation(Box<dyn std::error::Error + Send + Sync>),
    /// The wrapped operation panicked.
    #[error("Operation panicked: {0}")]
    Panicked(String),
    /// The frame was aborted by a protocol violation.
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    /// The producer went away without publishing.
    #[error("Actor dropped the result before publishing it")]
    ActorDropped,
    /// A bounded wait gave up. The result may still arrive later.
    #[error("Timed out waiting for the result")]
    Timeout,
}

impl FrameworkError {
    /// True for failures that aborted the frame rather than being reported by it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameworkError::Protocol(_))
    }

    /// The violation behind a fatal error, if any.
    pub fn violation(&self) -> Option<ProtocolViolation> {
        match self {
            FrameworkError::Protocol(violation) => Some(*violation),
            _ => None,
        }
    }

    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if !err.is_panic() {
            return FrameworkError::ActorDropped;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        FrameworkError::Panicked(message)
    }
}
