//! # One-shot Results
//!
//! Every actor call returns a [`Future`] right away and resolves it later from the spawned
//! unit of work through the matching [`Promise`]. The pair works like
//! `tokio::sync::oneshot`, with two differences the handoff protocol relies on:
//!
//! - publishing twice is reported as [`ProtocolViolation::DoublePublish`] instead of being
//!   impossible, because the producer only holds `&Promise`;
//! - any number of consumers may wait for completion ([`Future::ready`]), but the value
//!   itself is taken once.
//!
//! `Future` implements [`IntoFuture`], so a result is usually consumed with `.await`:
//!
//! ```rust
//! use handoff_framework::future;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (promise, result) = future::channel::<u32>();
//!     tokio::spawn(async move {
//!         promise.publish(Ok(7)).unwrap();
//!     });
//!     assert_eq!(result.await.unwrap(), 7);
//! }
//! ```

use crate::error::{FrameworkError, ProtocolViolation};
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

enum Slot<T> {
    Empty,
    Completed(Result<T, FrameworkError>),
    Taken,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    completed: watch::Sender<bool>,
}

impl<T> Shared<T> {
    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates an unresolved result cell, returning its producer and consumer halves.
pub fn channel<T>() -> (Promise<T>, Future<T>) {
    let (completed, _) = watch::channel(false);
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Empty),
        completed,
    });
    (
        Promise {
            shared: shared.clone(),
        },
        Future { shared },
    )
}

/// Producer half. Dropping it unpublished resolves the Future with
/// [`FrameworkError::ActorDropped`].
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// Moves the cell from Empty to Completed. Only the first call succeeds.
    pub fn publish(&self, outcome: Result<T, FrameworkError>) -> Result<(), ProtocolViolation> {
        let mut slot = self.shared.slot();
        if !matches!(*slot, Slot::Empty) {
            return Err(ProtocolViolation::DoublePublish);
        }
        *slot = Slot::Completed(outcome);
        drop(slot);
        self.shared.completed.send_replace(true);
        Ok(())
    }

    pub fn is_published(&self) -> bool {
        *self.shared.completed.borrow()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Completed(Err(FrameworkError::ActorDropped));
            drop(slot);
            self.shared.completed.send_replace(true);
        }
    }
}

/// Consumer half of an actor call's result.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<T> Future<T> {
    /// A Future that is already resolved, used when a call fails before spawning work.
    pub fn failed(error: FrameworkError) -> Self {
        let (promise, future) = channel();
        // Fresh cell, cannot be published yet.
        let _ = promise.publish(Err(error));
        future
    }

    pub fn is_completed(&self) -> bool {
        *self.shared.completed.borrow()
    }

    /// Waits until the result is published without taking it.
    pub async fn ready(&self) {
        let mut completed = self.shared.completed.subscribe();
        // The sender lives in `shared`, which we keep alive, so this cannot fail.
        let _ = completed.wait_for(|done| *done).await;
    }

    /// Takes the result if it has been published.
    ///
    /// Returns `None` while the cell is Empty, and a [`ProtocolViolation::DoubleTake`]
    /// error once the value has already been taken.
    pub fn try_take(&self) -> Option<Result<T, FrameworkError>> {
        let mut slot = self.shared.slot();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Empty => {
                *slot = Slot::Empty;
                None
            }
            Slot::Completed(outcome) => Some(outcome),
            Slot::Taken => Some(Err(ProtocolViolation::DoubleTake.into())),
        }
    }

    /// Waits for the result and takes it.
    pub async fn wait(self) -> Result<T, FrameworkError> {
        self.ready().await;
        self.take_ready()
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// Only the consumer stops waiting: the frame keeps running and its result can be
    /// picked up later from the same Future.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<T, FrameworkError> {
        match tokio::time::timeout(timeout, self.ready()).await {
            Ok(()) => self.take_ready(),
            Err(_) => Err(FrameworkError::Timeout),
        }
    }

    fn take_ready(&self) -> Result<T, FrameworkError> {
        self.try_take()
            .unwrap_or(Err(FrameworkError::ActorDropped))
    }
}

impl<T: Send + 'static> IntoFuture for Future<T> {
    type Output = Result<T, FrameworkError>;
    type IntoFuture = Pin<Box<dyn std::future::Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_resolves_future() {
        let (promise, result) = channel::<String>();
        assert!(!result.is_completed());
        assert!(result.try_take().is_none());

        promise.publish(Ok("ann".to_string())).unwrap();
        assert!(result.is_completed());
        assert_eq!(result.await.unwrap(), "ann");
    }

    #[tokio::test]
    async fn test_second_publish_is_rejected() {
        let (promise, result) = channel::<u32>();
        promise.publish(Ok(1)).unwrap();
        assert_eq!(
            promise.publish(Ok(2)),
            Err(ProtocolViolation::DoublePublish)
        );
        // The first value wins.
        assert_eq!(result.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_value_is_taken_once() {
        let (promise, result) = channel::<u32>();
        let other = result.clone();
        promise.publish(Ok(5)).unwrap();

        assert_eq!(result.wait().await.unwrap(), 5);
        let second = other.wait().await;
        assert!(matches!(
            second,
            Err(FrameworkError::Protocol(ProtocolViolation::DoubleTake))
        ));
    }

    #[tokio::test]
    async fn test_many_consumers_observe_completion() {
        let (promise, result) = channel::<u32>();
        let mut waiters = vec![];
        for _ in 0..4 {
            let consumer = result.clone();
            waiters.push(tokio::spawn(async move {
                consumer.ready().await;
                consumer.is_completed()
            }));
        }

        tokio::task::yield_now().await;
        promise.publish(Ok(9)).unwrap();

        for waiter in waiters {
            assert!(waiter.await.unwrap());
        }
        assert_eq!(result.await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_dropped_promise_resolves_as_dropped() {
        let (promise, result) = channel::<u32>();
        drop(promise);
        assert!(matches!(result.await, Err(FrameworkError::ActorDropped)));
    }

    #[tokio::test]
    async fn test_wait_timeout_keeps_result_available() {
        let (promise, result) = channel::<u32>();
        let waited = result.wait_timeout(Duration::from_millis(10)).await;
        assert!(matches!(waited, Err(FrameworkError::Timeout)));

        promise.publish(Ok(3)).unwrap();
        let waited = result.wait_timeout(Duration::from_millis(10)).await;
        assert_eq!(waited.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_future_is_already_resolved() {
        let result = Future::<()>::failed(ProtocolViolation::ReleaseWithoutHold.into());
        assert!(result.is_completed());
        let err = result.await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.violation(), Some(ProtocolViolation::ReleaseWithoutHold));
    }
}
