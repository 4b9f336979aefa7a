//! One-shot scheduled tasks with cancellation
//!
//! The refresh scheduler arms exactly one pending task at a time and must be
//! able to cancel it at any point before it runs. Cancellation is a shared
//! atomic flag checked after the delay elapses, so a cancelled task never
//! executes its body.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Handle to a scheduled task, used for cancellation.
///
/// Cloning shares the same cancellation flag.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel the scheduled task. Idempotent; a task whose delay has already
    /// elapsed and whose body has started cannot be stopped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the task has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Run `task` once after `delay`, unless cancelled first.
///
/// A zero delay still yields through the timer queue, so the returned handle
/// can cancel the task before it runs.
pub fn schedule_once<F, Fut>(delay: Duration, task: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = TimerHandle::new();
    let flag = handle.cancelled.clone();

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if flag.load(Ordering::SeqCst) {
            debug!("scheduled task cancelled before execution");
            return;
        }
        task().await;
    });

    handle
}

#[cfg(test)]
mod tests {
    //! Unit tests for the one-shot scheduler.
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Validates `schedule_once` execution for the normal elapse scenario.
    ///
    /// Assertions:
    /// - Ensures the task runs exactly once after the delay.
    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let _handle = schedule_once(Duration::from_secs(5), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Let the spawned task register its sleep before advancing the clock.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    /// Validates `TimerHandle::cancel` for the cancel-before-elapse scenario.
    ///
    /// Assertions:
    /// - Ensures a cancelled task never runs.
    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_execution() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let handle = schedule_once(Duration::from_secs(5), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::advance(Duration::from_secs(10)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    /// Validates `schedule_once` with zero delay for the immediate-but-
    /// cancellable scenario.
    ///
    /// Assertions:
    /// - Ensures cancellation issued before the runtime polls the task wins.
    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_still_cancellable() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let handle = schedule_once(Duration::ZERO, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();

        tokio::time::advance(Duration::from_millis(1)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
