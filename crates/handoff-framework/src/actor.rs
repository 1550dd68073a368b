//! # Actors
//!
//! An [`Actor<T>`] owns one wrapped value of type `T` behind one exclusive lock. It has
//! no mailbox and no run loop: every operation is its own unit of work, started by
//! [`Actor::dispatch`], and calls on the same actor simply queue on its lock.
//!
//! ## The call protocol
//!
//! `dispatch(ctx, op_name, op)` does, in order:
//!
//! 1. release the caller's lock (`ctx.unlock_parent()`);
//! 2. derive a child context bound to this actor's lock;
//! 3. return an unresolved [`Future`] to the caller;
//! 4. in a spawned task:
//!     1. acquire this actor's lock,
//!     2. run `op(child)` (in its own task, so a panic cannot skip the steps below),
//!     3. close the child frame, releasing this actor's lock,
//!     4. reacquire the caller's lock (`ctx.lock_parent()`),
//!     5. publish the outcome.
//!
//! The own lock is released *before* the caller's lock is reacquired, so a task never
//! waits for one lock while holding another. Two chains crossing in opposite directions
//! (A calling B while B calls A) therefore cannot deadlock.
//!
//! Once a caller observes the Future resolved, its own lock is held again on its behalf.
//!
//! ## Failures
//!
//! | What happened                        | Future resolves to                  |
//! |--------------------------------------|-------------------------------------|
//! | `op` returned `Err(e)`               | `FrameworkError::Implementation(e)` |
//! | `op` panicked                        | `FrameworkError::Panicked`          |
//! | a protocol violation in the frame    | `FrameworkError::Protocol(v)`       |
//! | reacquiring the caller's lock failed | `FrameworkError::Protocol(v)`       |
//!
//! In every case the actor's lock is released and the caller's lock reacquisition is
//! attempted before anything is published.

use crate::context::{Context, ExclusiveLock, LockGuard};
use crate::error::FrameworkError;
use crate::future::{self, Future, Promise};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, debug_span, error, warn, Instrument};

/// The lock of an actor. Holding its guard is the only way to reach the wrapped value.
struct ActorLock<T> {
    state: Arc<Mutex<T>>,
}

#[async_trait]
impl<T: Send + 'static> ExclusiveLock for ActorLock<T> {
    async fn lock(&self) -> LockGuard {
        Box::new(self.state.clone().lock_owned().await)
    }
}

/// A wrapped value plus the exclusive lock guarding it.
///
/// Cloning gives another handle to the same actor.
///
/// ```rust
/// use handoff_framework::{Actor, Context, ProtocolViolation};
///
/// #[derive(Default)]
/// struct Counter {
///     hits: u32,
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let counter = Actor::new(Counter::default());
///     let ctx = Context::root();
///
///     let hits = counter
///         .dispatch(&ctx, "hit", |ctx| async move {
///             ctx.with_state(|c: &mut Counter| {
///                 c.hits += 1;
///                 c.hits
///             })
///         })
///         .await
///         .unwrap();
///
///     assert_eq!(hits, 1);
///     assert!(ctx.is_held());
/// }
/// ```
pub struct Actor<T> {
    name: &'static str,
    lock: Arc<ActorLock<T>>,
}

impl<T> Clone for Actor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            lock: self.lock.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Actor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor").field("name", &self.name).finish()
    }
}

impl<T: Send + 'static> Actor<T> {
    /// Wraps `internal`, taking ownership of it. The lock starts unlocked.
    pub fn new(internal: T) -> Self {
        // "User" instead of "handoff_sample::user_actor::User", "Option" for "Option<..>"
        let path = std::any::type_name::<T>();
        let path = path.split('<').next().unwrap_or(path);
        let name = path.rsplit("::").next().unwrap_or(path);
        Self::named(name, internal)
    }

    /// Like [`new`](Self::new), with an explicit name for log fields.
    pub fn named(name: &'static str, internal: T) -> Self {
        Self {
            name,
            lock: Arc::new(ActorLock {
                state: Arc::new(Mutex::new(internal)),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The lock child contexts of this actor are bound to.
    pub fn lock(&self) -> Arc<dyn ExclusiveLock> {
        self.lock.clone()
    }

    /// True while some frame holds this actor's lock.
    pub fn is_locked(&self) -> bool {
        self.lock.state.try_lock().is_err()
    }

    /// Runs `op` as one operation of this actor, following the handoff protocol.
    ///
    /// `ctx` must currently hold the caller's lock; it is released here and held again
    /// by the time the returned Future resolves. `op` receives the child context, which
    /// holds this actor's lock: reach the state with [`Context::with_state`] and pass the
    /// context on to make nested calls.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch<R, E, F, Fut>(&self, ctx: &Context, op: &'static str, f: F) -> Future<R>
    where
        R: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<R, E>> + Send + 'static,
    {
        if let Err(violation) = ctx.unlock_parent() {
            return Future::failed(violation.into());
        }
        let frame = ctx.new_child_context(self.lock());
        let (promise, result) = future::channel();

        let span = debug_span!("frame", actor = self.name, op, id = frame.id());
        tokio::spawn(run_frame(ctx.clone(), frame, promise, f).instrument(span));

        result
    }
}

async fn run_frame<R, E, F, Fut>(parent: Context, frame: Context, promise: Promise<R>, f: F)
where
    R: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<R, E>> + Send + 'static,
{
    let outcome = match frame.lock_parent().await {
        Ok(()) => {
            debug!("Started");
            match tokio::spawn(f(frame.clone())).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    warn!(error = %e, "Operation failed");
                    Err(FrameworkError::Implementation(Box::new(e)))
                }
                Err(join) => {
                    let err = FrameworkError::from_join(join);
                    warn!(error = %err, "Operation did not finish");
                    Err(err)
                }
            }
        }
        Err(violation) => Err(violation.into()),
    };

    // Releases our lock; a violation anywhere in the frame discards its value.
    let outcome = match frame.finish() {
        Some(violation) => Err(FrameworkError::Protocol(violation)),
        None => outcome,
    };

    let outcome = match parent.lock_parent().await {
        Ok(()) => outcome,
        Err(violation) => Err(FrameworkError::Protocol(violation)),
    };

    debug!(ok = outcome.is_ok(), "Finished");
    if let Err(violation) = promise.publish(outcome) {
        error!(%violation, "Result already published");
    }
}
