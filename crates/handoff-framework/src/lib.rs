//! # Handoff Framework
//!
//! Turns plain values into concurrency-safe actors. Every operation on an actor is
//! asynchronous: it returns a [`Future`] immediately and runs as an independent Tokio
//! task guarded by the actor's exclusive lock.
//!
//! ## Why a handoff?
//!
//! The obvious way to guard shared state is "lock the caller, then lock the callee".
//! That deadlocks as soon as two actors call each other, directly or through a chain
//! that loops back to an ancestor. This crate threads a [`Context`] through every call
//! instead:
//!
//! - the caller's lock is **released** before crossing into another actor;
//! - the callee runs under its own lock with a child context;
//! - the caller's lock is **reacquired** on its behalf before the result is published.
//!
//! No frame ever waits on a lock while holding another one, so cycles such as
//! `A → B → A` complete, and each actor's state is still touched by one frame at a time.
//!
//! ## Architecture Overview
//!
//! 1. **Results** ([`future`]) - [`Future`] / [`Promise`], a single-assignment cell.
//! 2. **Lock ownership** ([`context`]) - [`Context`] and the [`ExclusiveLock`] interface.
//! 3. **Actors** ([`actor`]) - [`Actor<T>`] and [`Actor::dispatch`], the call protocol.
//! 4. **Call sites** ([`macros`]) - [`actor!`] emits one typed method and one
//!    `<Op>Result` type per operation.
//!
//! ## Quick Example
//!
//! ```rust
//! use handoff_framework::{actor, Context, ProtocolViolation};
//!
//! pub struct User {
//!     name: String,
//! }
//!
//! impl User {
//!     async fn set_name(ctx: Context, name: String) -> Result<(String,), ProtocolViolation> {
//!         let previous = ctx.with_state(|u: &mut User| std::mem::replace(&mut u.name, name))?;
//!         Ok((previous,))
//!     }
//! }
//!
//! actor! {
//!     pub struct UserActor(User);
//!
//!     fn set_name(name: String) -> (previous: String);
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let user = UserActor::new(User { name: "bob".into() });
//!     let ctx = Context::root();
//!
//!     // Returns at once; the write happens in a spawned task.
//!     let pending = user.set_name(&ctx, "ann".into());
//!     let SetNameResult { previous } = pending.await.unwrap();
//!     assert_eq!(previous, "bob");
//! }
//! ```
//!
//! ## Errors
//!
//! Operation failures reach the caller as [`FrameworkError`] through the Future. Breaking
//! the protocol (releasing twice, publishing twice, returning while a nested call still
//! owes a relock, ...) is a [`ProtocolViolation`]: it aborts the frame it happened in.
//!
//! ## Testing
//!
//! The [`mock`] module provides [`RecordingLock`](mock::RecordingLock) to check lock
//! traffic without spawning actors.

pub mod actor;
pub mod context;
pub mod error;
pub mod future;
pub mod macros;
pub mod mock;
pub mod tracing;

#[doc(hidden)]
pub use paste;

// Re-export core types for convenience
pub use actor::Actor;
pub use context::{Context, ExclusiveLock, LockGuard};
pub use error::{FrameworkError, ProtocolViolation};
pub use future::{Future, Promise};
