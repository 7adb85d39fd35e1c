use revai_core::{Job, JobId, JobResult, JobStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

/// Outcome of an [`Queue::enqueue`] attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    Duplicate(JobId),
    Full,
    Closed,
}

/// Bounded FIFO queue plus the status/result index that lets callers query
/// a job's lifecycle without touching the queue itself.
///
/// The channel provides the FIFO ordering and the bounded backlog (its
/// capacity *is* `maxQueueDepth`); the side tables exist only so `status`
/// and `size` are O(1) lookups that never block a worker.
pub(crate) struct Queue {
    sender: mpsc::Sender<JobId>,
    receiver: AsyncMutex<mpsc::Receiver<JobId>>,
    jobs: RwLock<HashMap<JobId, Job>>,
    results: RwLock<HashMap<JobId, JobResult>>,
    depth: AtomicUsize,
    capacity: usize,
    closed: AtomicBool,
}

impl Queue {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: AsyncMutex::new(receiver),
            jobs: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
            depth: AtomicUsize::new(0),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the existing job id if `job.id` is already present in a
    /// non-terminal state; submission of a duplicate is idempotent.
    pub(crate) fn active_duplicate(&self, job_id: JobId) -> Option<JobId> {
        let jobs = self.jobs.read().unwrap();
        jobs.get(&job_id)
            .filter(|job| !job.status.is_terminal())
            .map(|_| job_id)
    }

    /// Admits `job` at the tail of the queue.
    pub(crate) fn enqueue(&self, job: Job) -> EnqueueOutcome {
        if self.closed.load(Ordering::SeqCst) {
            return EnqueueOutcome::Closed;
        }
        if let Some(existing) = self.active_duplicate(job.id) {
            return EnqueueOutcome::Duplicate(existing);
        }

        match self.sender.try_send(job.id) {
            Ok(()) => {
                self.jobs.write().unwrap().insert(job.id, job);
                self.depth.fetch_add(1, Ordering::SeqCst);
                EnqueueOutcome::Enqueued
            }
            Err(_) => EnqueueOutcome::Full,
        }
    }

    /// Re-enqueues `job` at the tail, e.g. for a retry. Bypasses the
    /// duplicate check since the job is already tracked.
    pub(crate) fn re_enqueue(&self, job: Job) -> EnqueueOutcome {
        match self.sender.try_send(job.id) {
            Ok(()) => {
                self.jobs.write().unwrap().insert(job.id, job);
                self.depth.fetch_add(1, Ordering::SeqCst);
                EnqueueOutcome::Enqueued
            }
            Err(_) => EnqueueOutcome::Full,
        }
    }

    /// Pulls the oldest job off the queue and marks it `Running`.
    ///
    /// Returns `None` once the queue is closed and drained (shutdown).
    pub(crate) async fn dequeue(&self) -> Option<Job> {
        let job_id = {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await?
        };
        self.depth.fetch_sub(1, Ordering::SeqCst);

        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&job_id)?;
        job.status = JobStatus::Running;
        Some(job.clone())
    }

    pub(crate) fn status(&self, job_id: JobId) -> Option<JobStatus> {
        self.jobs.read().unwrap().get(&job_id).map(|job| job.status)
    }

    pub(crate) fn set_status(&self, job_id: JobId, status: JobStatus, last_error: Option<String>) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(&job_id) {
            job.status = status;
            job.last_error = last_error;
        }
    }

    pub(crate) fn job(&self, job_id: JobId) -> Option<Job> {
        self.jobs.read().unwrap().get(&job_id).cloned()
    }

    pub(crate) fn record_result(&self, result: JobResult) {
        self.results.write().unwrap().insert(result.job_id, result);
    }

    pub(crate) fn result(&self, job_id: JobId) -> Option<JobResult> {
        self.results.read().unwrap().get(&job_id).cloned()
    }

    pub(crate) fn size(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Stops accepting new work; workers keep draining what's already queued.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Drains every job still sitting in the channel without blocking,
    /// e.g. once a shutdown deadline has passed and workers are being
    /// aborted. Jobs already handed to a worker (past `dequeue`) are not
    /// included.
    pub(crate) async fn drain_remaining(&self) -> Vec<Job> {
        let mut receiver = self.receiver.lock().await;
        let mut drained = Vec::new();
        while let Ok(job_id) = receiver.try_recv() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            if let Some(job) = self.jobs.read().unwrap().get(&job_id).cloned() {
                drained.push(job);
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revai_core::JobKind;

    fn job(cost: f64) -> Job {
        Job::new("alice", "10.0.0.1", JobKind::new("scan"), vec![], cost)
    }

    #[tokio::test]
    async fn fifo_ordering_is_preserved() {
        let queue = Queue::new(10);
        let a = job(0.1);
        let b = job(0.1);
        let (a_id, b_id) = (a.id, b.id);

        assert_eq!(queue.enqueue(a), EnqueueOutcome::Enqueued);
        assert_eq!(queue.enqueue(b), EnqueueOutcome::Enqueued);

        assert_eq!(queue.dequeue().await.unwrap().id, a_id);
        assert_eq!(queue.dequeue().await.unwrap().id, b_id);
    }

    #[tokio::test]
    async fn rejects_when_full() {
        let queue = Queue::new(1);
        assert_eq!(queue.enqueue(job(0.1)), EnqueueOutcome::Enqueued);
        assert_eq!(queue.enqueue(job(0.1)), EnqueueOutcome::Full);
    }

    #[test]
    fn duplicate_submission_is_idempotent() {
        let queue = Queue::new(10);
        let mut a = job(0.1);
        a.id = JobId::new_v4();
        let dup = a.clone();

        assert_eq!(queue.enqueue(a), EnqueueOutcome::Enqueued);
        assert_eq!(queue.enqueue(dup), EnqueueOutcome::Duplicate(queue_only_id(&queue)));
    }

    fn queue_only_id(queue: &Queue) -> JobId {
        *queue.jobs.read().unwrap().keys().next().unwrap()
    }

    #[tokio::test]
    async fn size_tracks_depth() {
        let queue = Queue::new(10);
        assert_eq!(queue.size(), 0);
        queue.enqueue(job(0.1));
        assert_eq!(queue.size(), 1);
        queue.dequeue().await;
        assert_eq!(queue.size(), 0);
    }
}
