//! `scheduler` crate — the Background Flow Scheduler.
//!
//! Owns a set of in-flight background tasks spawned by repeater-driven
//! (and other externally-triggered) flow runs. Tasks are tracked so the
//! whole set can be cancelled in bulk — e.g. when the active flow
//! selection changes and any loop still running against the old
//! selection should stop. Cancellation is cooperative: a task only
//! actually stops at its next checkpoint (the repeater node checks
//! `ActiveFlowState` before each iteration); this scheduler only revokes
//! the `JoinHandle`s, it doesn't know what the task was doing.

use std::sync::Mutex;

use tokio::task::JoinHandle;

use nodes::{BackgroundScheduler, BoxedTask};

/// Concrete, process-wide implementation of [`nodes::BackgroundScheduler`].
#[derive(Default)]
pub struct BackgroundFlowScheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundFlowScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still tracked (finished tasks are swept out lazily
    /// on the next `spawn` or `cancel_all`).
    pub fn tracked_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Cancel every task that hasn't finished yet.
    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl BackgroundScheduler for BackgroundFlowScheduler {
    fn spawn(&self, task: BoxedTask) {
        let handle = tokio::spawn(task);
        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn spawn_tracks_and_runs_task() {
        let scheduler = BackgroundFlowScheduler::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();

        scheduler.spawn(Box::pin(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_all_aborts_pending_tasks() {
        let scheduler = BackgroundFlowScheduler::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let completed_clone = completed.clone();

        scheduler.spawn(Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            completed_clone.fetch_add(1, Ordering::SeqCst);
        }));

        scheduler.cancel_all();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(completed.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.tracked_count(), 0);
    }
}
