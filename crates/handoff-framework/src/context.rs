//! # Lock-ownership Contexts
//!
//! A [`Context`] says which exclusive lock the active call frame is responsible for.
//! It is threaded through a call tree: the root of a tree starts with
//! [`Context::root`], and every actor call derives a child bound to the callee's lock
//! with [`Context::new_child_context`].
//!
//! ## The handoff
//!
//! Crossing into another actor never happens while holding a lock:
//!
//! 1. the caller's context is released ([`Context::unlock_parent`]);
//! 2. the callee runs under its own child context;
//! 3. the caller's context is reacquired ([`Context::lock_parent`]) right before the
//!    callee publishes its result.
//!
//! So when a caller sees its result, it holds its own lock again, and no two frames ever
//! wait on each other's locks. A caller may not assume its actor's state stayed frozen
//! across the nested call: other calls may run on it in between.
//!
//! ## Frame states
//!
//! | State       | Meaning                                              |
//! |-------------|------------------------------------------------------|
//! | `Held`      | The frame owns its lock (a root holds "no lock")     |
//! | `Released`  | Handed off to a nested call, a relock is owed        |
//! | `Acquiring` | A relock is waiting for the lock                     |
//! | `Lent`      | Held, with the guard lent to [`Context::with_state`] |
//! | `Closed`    | The frame finished; its lock is gone for good        |
//!
//! Any transition outside this table is a [`ProtocolViolation`]. The first violation is
//! recorded on the context and aborts the frame.

use crate::error::ProtocolViolation;
use async_trait::async_trait;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error};

/// Proof of holding an [`ExclusiveLock`]. Dropping it releases the lock.
pub type LockGuard = Box<dyn Any + Send>;

/// The `{lock, unlock}` pair a [`Context`] is bound to.
///
/// Contexts only see this trait, never a concrete lock type, so frames of different
/// actors (and test locks, see [`crate::mock::RecordingLock`]) chain together freely.
#[async_trait]
pub trait ExclusiveLock: Send + Sync + 'static {
    /// Blocks until the lock is acquired.
    async fn lock(&self) -> LockGuard;

    /// Releases a guard obtained from [`lock`](Self::lock).
    fn unlock(&self, guard: LockGuard) {
        drop(guard);
    }
}

enum Hold {
    Held(Option<LockGuard>),
    Released,
    Acquiring,
    Lent,
    Closed,
}

impl Hold {
    fn name(&self) -> &'static str {
        match self {
            Hold::Held(_) => "held",
            Hold::Released => "released",
            Hold::Acquiring => "acquiring",
            Hold::Lent => "lent",
            Hold::Closed => "closed",
        }
    }
}

static NEXT_FRAME: AtomicU64 = AtomicU64::new(1);

struct Frame {
    id: u64,
    lock: Option<Arc<dyn ExclusiveLock>>,
    hold: Mutex<Hold>,
    violation: Mutex<Option<ProtocolViolation>>,
    parent: Option<Context>,
}

/// A lock-ownership token for one call frame.
///
/// Cloning is cheap and yields a handle to the *same* frame; the clone exists so the
/// spawned unit of work can relock the caller's frame. Never use one frame's context
/// for two concurrent calls: the second [`unlock_parent`](Self::unlock_parent) fails.
#[derive(Clone)]
pub struct Context {
    frame: Arc<Frame>,
}

impl Default for Context {
    fn default() -> Self {
        Self::root()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.frame.id)
            .field("state", &self.hold().name())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Context {
    fn new(lock: Option<Arc<dyn ExclusiveLock>>, hold: Hold, parent: Option<Context>) -> Self {
        Self {
            frame: Arc::new(Frame {
                id: NEXT_FRAME.fetch_add(1, Ordering::Relaxed),
                lock,
                hold: Mutex::new(hold),
                violation: Mutex::new(None),
                parent,
            }),
        }
    }

    /// A fresh context for the root of a call tree.
    ///
    /// It represents no lock, so releasing and reacquiring it never blocks, but the
    /// pairing rules still apply.
    pub fn root() -> Self {
        Self::new(None, Hold::Held(None), None)
    }

    /// Derives a context bound to `lock`, remembering `self` as the frame to hand control
    /// back to. Nothing is locked until the child's [`lock_parent`](Self::lock_parent).
    pub fn new_child_context(&self, lock: Arc<dyn ExclusiveLock>) -> Context {
        Self::new(Some(lock), Hold::Released, Some(self.clone()))
    }

    pub fn id(&self) -> u64 {
        self.frame.id
    }

    pub fn parent(&self) -> Option<&Context> {
        self.frame.parent.as_ref()
    }

    /// Number of frames between this one and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(ctx) = current {
            depth += 1;
            current = ctx.parent();
        }
        depth
    }

    pub fn is_held(&self) -> bool {
        matches!(*self.hold(), Hold::Held(_) | Hold::Lent)
    }

    /// The first protocol violation recorded on this frame.
    pub fn violation(&self) -> Option<ProtocolViolation> {
        *self.violation_slot()
    }

    /// Releases the lock this context represents.
    pub fn unlock_parent(&self) -> Result<(), ProtocolViolation> {
        let mut hold = self.hold();
        match std::mem::replace(&mut *hold, Hold::Released) {
            Hold::Held(guard) => {
                drop(hold);
                self.release(guard);
                debug!(frame = self.frame.id, "Lock released");
                Ok(())
            }
            other => {
                *hold = other;
                drop(hold);
                Err(self.violate(ProtocolViolation::ReleaseWithoutHold))
            }
        }
    }

    /// Blocks until the lock released by [`unlock_parent`](Self::unlock_parent) is held
    /// again. Must be called exactly once per release.
    ///
    /// Cancel safe: dropping the returned future before it completes leaves the frame
    /// released, and the relock can be retried.
    pub async fn lock_parent(&self) -> Result<(), ProtocolViolation> {
        {
            let mut hold = self.hold();
            let refused = match *hold {
                Hold::Released => None,
                Hold::Closed => Some(ProtocolViolation::FrameClosed),
                Hold::Held(_) | Hold::Acquiring | Hold::Lent => {
                    Some(ProtocolViolation::RelockWithoutRelease)
                }
            };
            if let Some(violation) = refused {
                return Err(self.violate(violation));
            }
            *hold = Hold::Acquiring;
        }
        let _pending = PendingRelock(self);

        let guard = match &self.frame.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let mut hold = self.hold();
        if matches!(*hold, Hold::Acquiring) {
            *hold = Hold::Held(guard);
            drop(hold);
            debug!(frame = self.frame.id, "Lock reacquired");
            return Ok(());
        }
        // Closed while we were waiting: give the lock straight back.
        drop(hold);
        self.release(guard);
        Err(self.violate(ProtocolViolation::FrameClosed))
    }

    /// Runs `f` on the state of the actor whose lock this frame holds.
    ///
    /// The closure is synchronous: the state can only be borrowed between handoffs,
    /// never across a nested call. While `f` runs the frame counts as held but its guard
    /// is lent out, so releasing the context or nesting another `with_state` inside `f`
    /// is a violation.
    pub fn with_state<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ProtocolViolation>
    where
        T: Send + 'static,
    {
        let guard = {
            let mut hold = self.hold();
            match std::mem::replace(&mut *hold, Hold::Lent) {
                Hold::Held(Some(guard)) => guard,
                other => {
                    *hold = other;
                    drop(hold);
                    return Err(self.violate(ProtocolViolation::StateNotHeld));
                }
            }
        };

        let mut lent = Lent {
            ctx: self,
            guard: Some(guard),
        };
        let state = lent
            .guard
            .as_mut()
            .and_then(|guard| (**guard).downcast_mut::<OwnedMutexGuard<T>>());
        match state {
            Some(state) => Ok(f(&mut **state)),
            None => Err(self.violate(ProtocolViolation::StateMismatch(
                std::any::type_name::<T>(),
            ))),
        }
    }

    /// Closes the frame, releasing its lock if held.
    ///
    /// Returns the violation that aborts the frame, if any. A frame that is not holding
    /// its lock at this point still owes a relock to a nested call, which is reported as
    /// [`ProtocolViolation::UnpairedRelease`]; that relock will fail with `FrameClosed`.
    pub(crate) fn finish(&self) -> Option<ProtocolViolation> {
        let mut hold = self.hold();
        let previous = std::mem::replace(&mut *hold, Hold::Closed);
        drop(hold);
        match previous {
            Hold::Held(guard) => self.release(guard),
            Hold::Released | Hold::Acquiring | Hold::Lent => {
                self.violate(ProtocolViolation::UnpairedRelease);
            }
            Hold::Closed => {
                self.violate(ProtocolViolation::FrameClosed);
            }
        }
        self.violation()
    }

    fn release(&self, guard: Option<LockGuard>) {
        if let (Some(lock), Some(guard)) = (&self.frame.lock, guard) {
            lock.unlock(guard);
        }
    }

    fn violate(&self, violation: ProtocolViolation) -> ProtocolViolation {
        let mut slot = self.violation_slot();
        if slot.is_none() {
            *slot = Some(violation);
        }
        error!(frame = self.frame.id, %violation, "Protocol violation");
        violation
    }

    fn hold(&self) -> MutexGuard<'_, Hold> {
        self.frame.hold.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn violation_slot(&self) -> MutexGuard<'_, Option<ProtocolViolation>> {
        self.frame
            .violation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Puts a frame that stopped waiting for its lock back to `Released`.
struct PendingRelock<'a>(&'a Context);

impl Drop for PendingRelock<'_> {
    fn drop(&mut self) {
        let mut hold = self.0.hold();
        if matches!(*hold, Hold::Acquiring) {
            *hold = Hold::Released;
        }
    }
}

/// Returns a guard lent out by [`Context::with_state`], also when `f` panics.
struct Lent<'a> {
    ctx: &'a Context,
    guard: Option<LockGuard>,
}

impl Drop for Lent<'_> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            *self.ctx.hold() = Hold::Held(Some(guard));
        }
    }
}
