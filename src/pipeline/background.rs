//! Fire-and-forget side effects of the reply path.
//!
//! Work is queued on a bounded channel and run one job at a time by a single
//! worker task, so submitting never waits on storage. Failures are logged and
//! published to subscribers instead of being returned to the submitter.

use super::compliance::{ComplianceMonitor, ViolationType};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot};

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
const ERROR_CHANNEL_CAPACITY: usize = 32;

type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

enum Job {
    Run { label: String, task: TaskFuture },
    Flush(oneshot::Sender<()>),
}

/// A background job that returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundError {
    pub label: String,
    pub message: String,
}

pub struct BackgroundTasks {
    jobs: mpsc::Sender<Job>,
    errors: broadcast::Sender<BackgroundError>,
}

impl BackgroundTasks {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(capacity: usize) -> Self {
        let (jobs, rx) = mpsc::channel(capacity.max(1));
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        tokio::spawn(run_worker(rx, errors.clone()));
        Self { jobs, errors }
    }

    /// Queue `task` without waiting. Returns `false` if it was dropped because
    /// the queue is full or the worker is gone.
    pub fn submit<F>(&self, label: impl Into<String>, task: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let label = label.into();
        match self.jobs.try_send(Job::Run {
            label,
            task: Box::pin(task),
        }) {
            Ok(()) => true,
            Err(TrySendError::Full(Job::Run { label, .. })) => {
                tracing::warn!(task = %label, "background queue full; dropping task");
                false
            }
            Err(TrySendError::Closed(_) | TrySendError::Full(_)) => {
                tracing::warn!("background worker stopped; dropping task");
                false
            }
        }
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<BackgroundError> {
        self.errors.subscribe()
    }

    /// Wait until every task submitted before this call has finished.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.jobs.send(Job::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_worker(mut rx: mpsc::Receiver<Job>, errors: broadcast::Sender<BackgroundError>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Run { label, task } => {
                if let Err(e) = task.await {
                    tracing::warn!(task = %label, "background task failed: {e:#}");
                    // No subscribers is fine.
                    let _ = errors.send(BackgroundError {
                        label,
                        message: format!("{e:#}"),
                    });
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("background worker stopped");
}

/// Hands violation reports to the shared [`ComplianceMonitor`] without
/// blocking the caller.
#[derive(Clone)]
pub struct ComplianceReporter {
    tasks: Arc<BackgroundTasks>,
    monitor: Arc<ComplianceMonitor>,
}

impl ComplianceReporter {
    pub fn new(tasks: Arc<BackgroundTasks>, monitor: Arc<ComplianceMonitor>) -> Self {
        Self { tasks, monitor }
    }

    pub fn report(&self, violations: &[ViolationType], original: &str, corrected: &str) {
        if violations.is_empty() {
            return;
        }
        tracing::debug!(
            ?violations,
            original,
            corrected,
            "reply violated response policy"
        );

        let monitor = Arc::clone(&self.monitor);
        let violations = violations.to_vec();
        self.tasks.submit("compliance", async move {
            // Every kind is counted in memory even when persisting fails.
            let mut first_error = None;
            for kind in violations {
                if let Err(e) = monitor.record_violation(kind).await {
                    first_error.get_or_insert(e);
                }
            }
            match first_error {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        });
    }
}
