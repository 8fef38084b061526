use crate::errors::{AppResult, JournalError};
use crate::models::{PageSettings, SettingField, TemplateVariant};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::{Mutex as StdMutex, RwLock};
use tokio::sync::{Mutex, Notify, OwnedMutexGuard};
use uuid::Uuid;

/// One settings change waiting to be written to the current page.
#[derive(Debug, Clone)]
pub struct MutationJob {
    pub job_id: Uuid,
    pub field: SettingField,
    pub variant: TemplateVariant,
    pub settings: PageSettings,
    pub queued_at: DateTime<Utc>,
}

impl MutationJob {
    pub fn new(field: SettingField, variant: TemplateVariant, settings: PageSettings) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            field,
            variant,
            settings,
            queued_at: Utc::now(),
        }
    }
}

/// Exclusive right to read and commit the journal page. Page creation and
/// settings mutations both hold it for their whole sequence.
#[derive(Clone, Default)]
pub struct DocumentLane {
    inner: Arc<Mutex<()>>,
}

impl DocumentLane {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.inner.clone().lock_owned().await
    }
}

pub type ExecutorFuture = Pin<Box<dyn Future<Output = bool> + Send>>;
pub type Executor = Arc<dyn Fn(MutationJob) -> ExecutorFuture + Send + Sync>;

/// FIFO queue drained by a single worker, one job at a time, under the
/// document lane.
#[derive(Clone)]
pub struct MutationScheduler {
    queue: Arc<StdMutex<VecDeque<MutationJob>>>,
    notify: Arc<Notify>,
    idle: Arc<Notify>,
    pending: Arc<AtomicUsize>,
    started: Arc<AtomicBool>,
    executor: Arc<RwLock<Option<Executor>>>,
    lane: DocumentLane,
    max_queue_size: usize,
}

impl MutationScheduler {
    pub fn new(lane: DocumentLane, max_queue_size: usize) -> Self {
        Self {
            queue: Arc::new(StdMutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            idle: Arc::new(Notify::new()),
            pending: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(AtomicBool::new(false)),
            executor: Arc::new(RwLock::new(None)),
            lane,
            max_queue_size,
        }
    }

    pub fn set_executor(&self, executor: Executor) {
        let mut writer = self
            .executor
            .write()
            .expect("scheduler executor write lock");
        *writer = Some(executor);
    }

    /// Queues `job` behind everything already waiting. Never blocks on the
    /// running job.
    pub fn enqueue(&self, job: MutationJob) -> AppResult<()> {
        {
            let mut queue = self.queue.lock().expect("mutation queue lock");
            if queue.len() >= self.max_queue_size {
                return Err(JournalError::QueueFull {
                    capacity: self.max_queue_size,
                });
            }
            tracing::debug!(job_id = %job.job_id, field = job.field.as_str(), "queued page mutation");
            self.pending.fetch_add(1, Ordering::SeqCst);
            queue.push_back(job);
        }
        self.notify.notify_one();
        Ok(())
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().expect("mutation queue lock").len()
    }

    /// Spawns the worker. Later calls are no-ops.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_loop().await;
        });
    }

    /// Resolves once every job queued so far has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    async fn run_loop(self) {
        loop {
            self.notify.notified().await;
            while let Some(job) = self.next_job() {
                let job_id = job.job_id;
                let waited_ms = (Utc::now() - job.queued_at).num_milliseconds().max(0);

                let failed = {
                    let _lane = self.lane.acquire().await;
                    tracing::debug!(job_id = %job_id, waited_ms, "running page mutation");
                    self.execute(job).await
                };
                if failed {
                    tracing::warn!(job_id = %job_id, "page mutation finished in failed state");
                }

                if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                    self.idle.notify_waiters();
                }
            }
        }
    }

    fn next_job(&self) -> Option<MutationJob> {
        self.queue.lock().expect("mutation queue lock").pop_front()
    }

    async fn execute(&self, job: MutationJob) -> bool {
        let executor = self
            .executor
            .read()
            .expect("scheduler executor read lock")
            .clone();
        match executor {
            Some(executor) => executor(job).await,
            None => true,
        }
    }
}
