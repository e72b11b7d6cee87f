//! The per-request background task collector.

use crate::error::TaskError;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use metrics::counter;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

enum TaskFn {
    Blocking(Box<dyn FnOnce() -> anyhow::Result<()> + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>),
}

/// An ordered list of work deferred until after the response is delivered.
///
/// A fresh collector is bound for every request whose handler asks for one.
/// Clones share the same list, so handler code can pass it around freely.
/// Adding a task never runs it; the collected tasks run once, in insertion
/// order, after the response has been handed to the client.
///
/// Arguments are captured by the closure.
///
/// # Example
///
/// ```rust
/// use tessera_tasks::BackgroundTasks;
///
/// # tokio_test::block_on(async {
/// let tasks = BackgroundTasks::new();
/// let email = "ada@example.com".to_string();
/// tasks.add_async_task(move || async move {
///     // send a welcome email to `email`
///     let _ = email;
///     Ok(())
/// });
/// tasks.add_task(|| Ok(()));
///
/// let report = tasks.take().run_all().await;
/// assert_eq!(report.completed, 2);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<Vec<TaskFn>>>,
}

impl BackgroundTasks {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a synchronous task. It runs on the blocking thread pool.
    pub fn add_task<F>(&self, task: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.inner.lock().push(TaskFn::Blocking(Box::new(task)));
    }

    /// Queues an asynchronous task. It runs on the runtime.
    pub fn add_async_task<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner
            .lock()
            .push(TaskFn::Async(Box::new(move || task().boxed())));
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drains the queued tasks into a batch, leaving the collector empty.
    #[must_use]
    pub fn take(&self) -> TaskBatch {
        TaskBatch {
            tasks: std::mem::take(&mut *self.inner.lock()),
        }
    }
}

impl fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("len", &self.len())
            .finish()
    }
}

/// Outcome of running a batch.
#[derive(Debug, Default)]
pub struct TaskReport {
    /// Tasks that returned `Ok`.
    pub completed: usize,
    /// Tasks that failed or panicked.
    pub failed: usize,
    /// The individual failures, in order.
    pub errors: Vec<TaskError>,
}

/// Tasks drained from a [`BackgroundTasks`], ready to run.
pub struct TaskBatch {
    tasks: Vec<TaskFn>,
}

impl TaskBatch {
    /// Number of tasks in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every task in insertion order.
    ///
    /// A failing task is logged and counted; the remaining tasks still run.
    pub async fn run_all(self) -> TaskReport {
        let mut report = TaskReport::default();
        let total = self.tasks.len();
        debug!(tasks = total, "running background tasks");

        for (index, task) in self.tasks.into_iter().enumerate() {
            match run_one(index, task).await {
                Ok(()) => {
                    counter!("tessera_background_tasks_total", "outcome" => "completed")
                        .increment(1);
                    report.completed += 1;
                }
                Err(err) => {
                    counter!("tessera_background_tasks_total", "outcome" => "failed").increment(1);
                    error!(task_index = index, error = %err, "background task failed");
                    report.failed += 1;
                    report.errors.push(err);
                }
            }
        }

        debug!(
            tasks = total,
            completed = report.completed,
            failed = report.failed,
            "background tasks finished"
        );
        report
    }
}

impl fmt::Debug for TaskBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBatch")
            .field("len", &self.tasks.len())
            .finish()
    }
}

async fn run_one(index: usize, task: TaskFn) -> Result<(), TaskError> {
    match task {
        TaskFn::Blocking(task) => match tokio::task::spawn_blocking(task).await {
            Ok(result) => result.map_err(|e| TaskError::failed(index, e)),
            Err(join) if join.is_panic() => {
                Err(TaskError::panicked(index, join.into_panic().as_ref()))
            }
            Err(join) => Err(TaskError::join(index, join.to_string())),
        },
        TaskFn::Async(task) => match AssertUnwindSafe(async move { task().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result.map_err(|e| TaskError::failed(index, e)),
            Err(payload) => Err(TaskError::panicked(index, payload.as_ref())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_add_does_not_run() {
        let ran = Arc::new(StdMutex::new(false));
        let flag = Arc::clone(&ran);
        let tasks = BackgroundTasks::new();
        tasks.add_task(move || {
            *flag.lock().unwrap() = true;
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tasks.len(), 1);
        assert!(!*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn test_runs_in_insertion_order_across_kinds() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let tasks = BackgroundTasks::new();

        let l = Arc::clone(&log);
        tasks.add_async_task(move || async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            l.lock().unwrap().push("async-1");
            Ok(())
        });
        let l = Arc::clone(&log);
        tasks.add_task(move || {
            l.lock().unwrap().push("sync-2");
            Ok(())
        });
        let l = Arc::clone(&log);
        tasks.add_async_task(move || async move {
            l.lock().unwrap().push("async-3");
            Ok(())
        });

        let report = tasks.take().run_all().await;
        assert_eq!(report.completed, 3);
        assert_eq!(*log.lock().unwrap(), vec!["async-1", "sync-2", "async-3"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_tasks() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let tasks = BackgroundTasks::new();

        tasks.add_task(|| Err(anyhow::anyhow!("disk full")));
        tasks.add_task(|| panic!("sync boom"));
        let l = Arc::clone(&log);
        tasks.add_async_task(move || async move {
            l.lock().unwrap().push("survivor");
            Ok(())
        });

        let report = tasks.take().run_all().await;
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 2);
        assert!(matches!(report.errors[0], TaskError::Failed { index: 0, .. }));
        assert!(matches!(report.errors[1], TaskError::Panicked { index: 1, .. }));
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[tokio::test]
    async fn test_take_drains_shared_list() {
        let tasks = BackgroundTasks::new();
        let handle = tasks.clone();
        handle.add_task(|| Ok(()));

        assert_eq!(tasks.len(), 1);
        let batch = tasks.take();
        assert_eq!(batch.len(), 1);
        assert!(tasks.is_empty());
        assert!(handle.is_empty());
        assert!(tasks.take().is_empty());
    }
}
