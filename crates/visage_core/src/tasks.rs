//! Registry of cancellable background tasks.
//!
//! Every loop and delayed callback the engine starts (render loop, liveness
//! heartbeat, blink restore, reconnect wait) is spawned through one registry,
//! so teardown can stop all of them at once and no timer fires into a
//! disposed engine.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct TaskRegistry {
    cancel: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled on shutdown, for loops that want to exit cleanly.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawn `fut`, racing it against shutdown. Returns false (and drops the
    /// future) once the registry has been shut down.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, name: &'static str, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            tracing::trace!(task = name, "registry shut down, not spawning");
            return false;
        }
        let token = self.cancel.clone();
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => tracing::trace!(task = name, "cancelled"),
                _ = fut => {}
            }
        });
        true
    }

    /// Run `f` once after `delay`, unless the registry shuts down first.
    pub fn schedule<F>(&self, name: &'static str, delay: Duration, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(name, async move {
            tokio::time::sleep(delay).await;
            f();
        })
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Cancel everything, pending timers included. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.lock().abort_all();
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_callback_fires_after_delay() {
        let registry = TaskRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        registry.schedule("probe", Duration::from_millis(150), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(149)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_timers() {
        let registry = TaskRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let f = fired.clone();
            registry.schedule("probe", Duration::from_secs(3), move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(registry.pending(), 3);

        registry.shutdown();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(registry.is_shut_down());
    }

    #[tokio::test]
    async fn test_spawn_after_shutdown_is_refused() {
        let registry = TaskRegistry::new();
        registry.shutdown();
        assert!(!registry.spawn("late", async {}));
        assert_eq!(registry.pending(), 0);
    }
}
