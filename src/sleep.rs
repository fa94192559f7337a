//! Pausing between retries.
//!
//! The [`Sleeper`] trait lets tests swap the real timer for a recorder,
//! so backoff behavior can be checked without waiting.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// A backoff wait was cancelled before its duration elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("backoff wait was interrupted")]
pub struct Interrupted;

/// Waits for a given duration.
///
/// `Ok(())` means the duration elapsed. Implementations must report a
/// cancelled wait as `Err(Interrupted)` instead of returning early with `Ok`.
pub trait Sleeper: Send + Sync {
    /// Pause the current task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = Result<(), Interrupted>> + Send;
}

/// Shared cancellation flag for in-flight backoff waits.
///
/// Once raised, the flag stays raised: every wait bound to it, current or
/// future, fails with [`Interrupted`].
///
/// # Example
///
/// ```
/// use trmnl_mirror::Cancellation;
///
/// let cancel = Cancellation::new();
/// assert!(!cancel.is_cancelled());
///
/// cancel.cancel();
/// assert!(cancel.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// Create a new, un-cancelled flag.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag, waking every wait bound to it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Timer-backed [`Sleeper`] using `tokio::time::sleep`.
///
/// Yields to the runtime instead of blocking a worker thread.
#[derive(Debug, Clone, Default)]
pub struct TokioSleeper {
    cancellation: Option<Cancellation>,
}

impl TokioSleeper {
    /// Create a sleeper that can only be cancelled by dropping the future.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind waits to a cancellation flag.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = Result<(), Interrupted>> + Send {
        let rx = self.cancellation.as_ref().map(Cancellation::subscribe);

        async move {
            let Some(mut rx) = rx else {
                tokio::time::sleep(duration).await;
                return Ok(());
            };

            let sleep = tokio::time::sleep(duration);
            tokio::pin!(sleep);

            let cancelled = tokio::select! {
                biased;
                changed = rx.wait_for(|cancelled| *cancelled) => changed.is_ok(),
                () = &mut sleep => return Ok(()),
            };

            if cancelled {
                return Err(Interrupted);
            }

            // Every flag handle is gone, so nothing can cancel us anymore.
            sleep.await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_elapses() {
        let start = tokio::time::Instant::now();
        TokioSleeper::new()
            .sleep(Duration::from_secs(4))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_with_idle_cancellation_elapses() {
        let sleeper = TokioSleeper::new().with_cancellation(Cancellation::new());
        assert_eq!(sleeper.sleep(Duration::from_millis(250)).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_fails_immediately() {
        let cancel = Cancellation::new();
        cancel.cancel();

        let start = tokio::time::Instant::now();
        let sleeper = TokioSleeper::new().with_cancellation(cancel.clone());
        assert_eq!(sleeper.sleep(Duration::from_secs(30)).await, Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(30));

        // Flag stays raised for the caller
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let cancel = Cancellation::new();
        let sleeper = TokioSleeper::new().with_cancellation(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(sleeper.sleep(Duration::from_secs(30)).await, Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(cancel.is_cancelled());
    }
}
