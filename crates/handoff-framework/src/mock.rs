//! # Mock Locks & Testing Guide
//!
//! Handoff bugs show up as lock traffic in the wrong order, so the easiest way to test
//! code that drives a [`Context`](crate::Context) by hand is to bind it to a lock that
//! writes down what happens to it.
//!
//! [`RecordingLock`] is a real exclusive lock (a `tokio::sync::Mutex<()>` underneath)
//! that logs every acquire and release. Bind a child context to it, drive the context,
//! then assert on [`RecordingLock::events`] or call [`RecordingLock::verify`].
//!
//! | Need                                      | Use                          |
//! |-------------------------------------------|------------------------------|
//! | Check pairing of `unlock`/`lock` by hand  | `RecordingLock`              |
//! | Check an operation end to end             | A real [`Actor`](crate::Actor) |
//!
//! ```rust
//! use handoff_framework::mock::{LockEvent, RecordingLock};
//! use handoff_framework::Context;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let lock = RecordingLock::new();
//!     let child = Context::root().new_child_context(Arc::new(lock.clone()));
//!
//!     child.lock_parent().await.unwrap();
//!     child.unlock_parent().unwrap();
//!
//!     assert_eq!(lock.events(), vec![LockEvent::Locked, LockEvent::Unlocked]);
//!     lock.verify();
//! }
//! ```

use crate::context::{ExclusiveLock, LockGuard};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One step of lock traffic seen by a [`RecordingLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Locked,
    Unlocked,
}

/// An exclusive lock that records its lock/unlock history.
///
/// Clones share the same lock and the same history.
#[derive(Clone, Default)]
pub struct RecordingLock {
    mutex: Arc<tokio::sync::Mutex<()>>,
    events: Arc<Mutex<Vec<LockEvent>>>,
}

impl RecordingLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn events(&self) -> Vec<LockEvent> {
        self.history().clone()
    }

    pub fn is_locked(&self) -> bool {
        self.mutex.try_lock().is_err()
    }

    /// Panics unless the history alternates `Locked`, `Unlocked`, ... and ends unlocked.
    pub fn verify(&self) {
        let events = self.events();
        for (i, event) in events.iter().enumerate() {
            let expected = if i % 2 == 0 {
                LockEvent::Locked
            } else {
                LockEvent::Unlocked
            };
            if *event != expected {
                panic!("Unbalanced lock history at step {}: {:?}", i, events);
            }
        }
        if events.len() % 2 != 0 {
            panic!("Lock still held at the end: {:?}", events);
        }
    }

    fn record(&self, event: LockEvent) {
        self.history().push(event);
    }

    fn history(&self) -> MutexGuard<'_, Vec<LockEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ExclusiveLock for RecordingLock {
    async fn lock(&self) -> LockGuard {
        let guard = self.mutex.clone().lock_owned().await;
        self.record(LockEvent::Locked);
        Box::new(guard)
    }

    fn unlock(&self, guard: LockGuard) {
        drop(guard);
        self.record(LockEvent::Unlocked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_lock_is_exclusive() {
        let lock = RecordingLock::new();
        let first = lock.lock().await;
        assert!(lock.is_locked());

        let contender = lock.clone();
        let waiter = tokio::spawn(async move {
            let guard = contender.lock().await;
            contender.unlock(guard);
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        lock.unlock(first);
        waiter.await.unwrap();
        lock.verify();
        assert_eq!(lock.events().len(), 4);
    }

    #[tokio::test]
    #[should_panic(expected = "Lock still held")]
    async fn test_verify_catches_a_held_lock() {
        let lock = RecordingLock::new();
        let _guard = lock.lock().await;
        lock.verify();
    }
}
