//! Job Queue & Worker Pool Coordinator
//!
//! Single owner of the job table, the FIFO pending queue and the
//! active-worker map. Every mutation goes through the operations
//! defined here; worker tasks only feed results back through
//! `on_worker_success` / `on_worker_failure`.
//!
//! Invariants:
//! - job paths are unique across the table
//! - `active.len() <= max_concurrency` at every instant
//! - at most one live worker per job; stale completions (job deleted
//!   or re-dispatched) are identified by generation stamp and dropped

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Job, JobEvent, JobState};
use crate::core::settings::{concurrency_bound, ProcessingConfig};
use crate::core::{CoreError, CoreResult};

/// A dispatch decision: spawn a worker for `path` using `config`.
///
/// The generation stamp ties the eventual completion message back to
/// this particular dispatch.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub path: PathBuf,
    pub generation: u64,
    pub config: ProcessingConfig,
}

struct ActiveWorker {
    generation: u64,
}

pub struct Coordinator {
    /// Job table in insertion order
    jobs: Vec<Job>,
    /// FIFO queue of paths waiting for a worker slot
    pending: VecDeque<PathBuf>,
    /// Paths currently held by a worker, with their dispatch stamp
    active: HashMap<PathBuf, ActiveWorker>,
    /// Worker pool size; observed at the next dispatch decision
    max_concurrency: usize,
    /// Upper bound for `max_concurrency` (cpu count - 1)
    limit_bound: usize,
    /// Next dispatch generation stamp
    next_generation: u64,
    /// Config of the current processing run, reused by `reprocess`
    config: Option<ProcessingConfig>,
    /// State notifications
    event_tx: mpsc::UnboundedSender<JobEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<JobEvent>>,
}

impl Coordinator {
    pub fn new(max_concurrency: usize) -> Self {
        Self::with_bound(max_concurrency, concurrency_bound())
    }

    /// Creates a coordinator with an explicit concurrency upper bound
    pub fn with_bound(max_concurrency: usize, bound: usize) -> Self {
        let bound = bound.max(1);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            jobs: Vec::new(),
            pending: VecDeque::new(),
            active: HashMap::new(),
            max_concurrency: max_concurrency.clamp(1, bound),
            limit_bound: bound,
            next_generation: 0,
            config: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Takes the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        self.event_rx.take()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Adds a file to the job table in `Unprocessed` state.
    ///
    /// A path already present in the table is rejected and the table
    /// left unchanged.
    pub fn enqueue(&mut self, path: PathBuf) -> CoreResult<()> {
        if self.job(&path).is_some() {
            return Err(CoreError::DuplicateJob(path));
        }
        self.emit(JobEvent::StateChanged {
            path: path.clone(),
            state: JobState::Unprocessed,
        });
        self.jobs.push(Job::new(path));
        Ok(())
    }

    /// Queues every `Unprocessed` job in table order and fills the
    /// worker pool. The config becomes the run snapshot reused by
    /// `reprocess`.
    pub fn start_processing(&mut self, config: ProcessingConfig) -> Vec<Dispatch> {
        self.config = Some(config);

        let unprocessed: Vec<PathBuf> = self
            .jobs
            .iter()
            .filter(|job| job.state == JobState::Unprocessed)
            .map(|job| job.path.clone())
            .collect();
        for path in unprocessed {
            self.mark_queued(path);
        }

        self.dispatch_next()
    }

    /// Fills free worker slots from the head of the pending queue.
    ///
    /// The single re-entry point: called after manual start, after
    /// every worker completion, and after a delete frees a slot. A
    /// no-op when the queue is empty or the pool is full.
    pub fn dispatch_next(&mut self) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();
        let Some(config) = self.config.clone() else {
            return dispatches;
        };

        while self.active.len() < self.max_concurrency {
            let Some(path) = self.pending.pop_front() else {
                break;
            };
            // Entries may be stale: the job was deleted while queued,
            // or is already held by a worker.
            if self.active.contains_key(&path) {
                continue;
            }
            let Some(job) = self.job_mut(&path) else {
                continue;
            };

            job.state = JobState::Processing;
            let generation = self.next_generation;
            self.next_generation += 1;
            self.active
                .insert(path.clone(), ActiveWorker { generation });
            self.emit(JobEvent::StateChanged {
                path: path.clone(),
                state: JobState::Processing,
            });
            debug!("Dispatching {} (generation {generation})", path.display());

            dispatches.push(Dispatch {
                path,
                generation,
                config: config.clone(),
            });
        }

        dispatches
    }

    /// Records a worker success and pulls the next pending job.
    ///
    /// Safe to call for a job deleted mid-flight: the stale completion
    /// is dropped without touching any other job.
    pub fn on_worker_success(
        &mut self,
        path: &Path,
        generation: u64,
        text: String,
    ) -> Vec<Dispatch> {
        if !self.release_worker(path, generation) {
            return Vec::new();
        }
        if let Some(job) = self.job_mut(path) {
            job.state = JobState::Done;
            job.result_text = Some(text.clone());
            job.error_message = None;
            info!("Job done: {}", path.display());
            self.emit(JobEvent::Completed {
                path: path.to_path_buf(),
                text,
            });
        }
        self.dispatch_next()
    }

    /// Records a worker failure and pulls the next pending job
    pub fn on_worker_failure(
        &mut self,
        path: &Path,
        generation: u64,
        error: String,
    ) -> Vec<Dispatch> {
        if !self.release_worker(path, generation) {
            return Vec::new();
        }
        if let Some(job) = self.job_mut(path) {
            job.state = JobState::Error;
            job.error_message = Some(error.clone());
            job.result_text = None;
            warn!("Job failed: {}: {error}", path.display());
            self.emit(JobEvent::Failed {
                path: path.to_path_buf(),
                error,
            });
        }
        self.dispatch_next()
    }

    /// Re-queues a finished (or never-started) job.
    ///
    /// Rejected while the job is `Processing`; a job already `Queued`
    /// is left as is so the pending queue never holds duplicates.
    pub fn reprocess(&mut self, path: &Path) -> CoreResult<Vec<Dispatch>> {
        let job = self
            .job(path)
            .ok_or_else(|| CoreError::JobNotFound(path.to_path_buf()))?;
        if job.state == JobState::Processing {
            return Err(CoreError::JobProcessing(path.to_path_buf()));
        }
        if self.config.is_none() {
            return Err(CoreError::ConfigMissing);
        }
        if job.state == JobState::Queued {
            return Ok(Vec::new());
        }

        self.mark_queued(path.to_path_buf());
        Ok(self.dispatch_next())
    }

    /// Removes a job from the table.
    ///
    /// A `Processing` job is detached from its worker: the slot is
    /// freed immediately (so a replacement can be dispatched) and the
    /// worker's eventual completion no longer matches any active entry.
    /// The in-flight external work itself is not interrupted.
    pub fn delete(&mut self, path: &Path) -> CoreResult<Vec<Dispatch>> {
        let index = self
            .jobs
            .iter()
            .position(|job| job.path == path)
            .ok_or_else(|| CoreError::JobNotFound(path.to_path_buf()))?;

        self.jobs.remove(index);
        self.pending.retain(|pending| pending != path);
        if self.active.remove(path).is_some() {
            debug!("Detached in-flight worker for {}", path.display());
        }
        self.emit(JobEvent::Removed {
            path: path.to_path_buf(),
        });

        Ok(self.dispatch_next())
    }

    /// Updates the worker pool size, clamped to `[1, cpu_count - 1]`.
    ///
    /// Takes effect at the next dispatch decision; already-running
    /// workers beyond a lowered limit are never preempted.
    pub fn set_concurrency(&mut self, n: usize) {
        self.max_concurrency = n.clamp(1, self.limit_bound);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, path: &Path) -> Option<&Job> {
        self.jobs.iter().find(|job| job.path == path)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Whether no work is queued or in flight
    pub fn is_drained(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn job_mut(&mut self, path: &Path) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.path == path)
    }

    fn mark_queued(&mut self, path: PathBuf) {
        if let Some(job) = self.job_mut(&path) {
            job.state = JobState::Queued;
            job.result_text = None;
            job.error_message = None;
        }
        self.emit(JobEvent::StateChanged {
            path: path.clone(),
            state: JobState::Queued,
        });
        self.pending.push_back(path);
    }

    /// Frees the concurrency slot for a completion message. Returns
    /// false for stale messages (deleted or re-dispatched job).
    fn release_worker(&mut self, path: &Path, generation: u64) -> bool {
        match self.active.get(path) {
            Some(worker) if worker.generation == generation => {
                self.active.remove(path);
                true
            }
            _ => {
                debug!(
                    "Dropping stale completion for {} (generation {generation})",
                    path.display()
                );
                false
            }
        }
    }

    fn emit(&self, event: JobEvent) {
        // Receiver may be gone (headless test); state stays correct.
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(max: usize) -> Coordinator {
        Coordinator::with_bound(max, 8)
    }

    fn path(name: &str) -> PathBuf {
        PathBuf::from(format!("/media/{name}"))
    }

    fn config() -> ProcessingConfig {
        ProcessingConfig::default()
    }

    fn states(c: &Coordinator) -> Vec<JobState> {
        c.jobs().iter().map(|j| j.state).collect()
    }

    #[test]
    fn test_enqueue_rejects_duplicates() {
        let mut c = coordinator(2);
        c.enqueue(path("a.mp3")).unwrap();
        let err = c.enqueue(path("a.mp3")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateJob(_)));
        assert_eq!(c.jobs().len(), 1);
        assert_eq!(states(&c), vec![JobState::Unprocessed]);
    }

    #[test]
    fn test_pool_never_exceeds_limit() {
        let mut c = coordinator(2);
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            c.enqueue(path(name)).unwrap();
        }

        let dispatches = c.start_processing(config());
        assert_eq!(dispatches.len(), 2);
        assert_eq!(c.active_count(), 2);
        assert_eq!(c.pending_count(), 1);
        assert_eq!(
            states(&c),
            vec![JobState::Processing, JobState::Processing, JobState::Queued]
        );
    }

    #[test]
    fn test_completion_pulls_next_queued_job() {
        let mut c = coordinator(2);
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            c.enqueue(path(name)).unwrap();
        }
        let dispatches = c.start_processing(config());

        let first = &dispatches[0];
        let next = c.on_worker_success(&first.path, first.generation, "text".to_string());
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].path, path("c.mp3"));
        assert_eq!(c.active_count(), 2);
        assert_eq!(c.job(&path("a.mp3")).unwrap().state, JobState::Done);
        assert_eq!(
            c.job(&path("a.mp3")).unwrap().result_text.as_deref(),
            Some("text")
        );
    }

    #[test]
    fn test_dispatch_next_is_idempotent_when_starved_or_full() {
        let mut c = coordinator(1);
        c.enqueue(path("a.mp3")).unwrap();
        c.enqueue(path("b.mp3")).unwrap();
        let dispatches = c.start_processing(config());
        assert_eq!(dispatches.len(), 1);

        // Pool full: no state changes
        let before = states(&c);
        assert!(c.dispatch_next().is_empty());
        assert_eq!(states(&c), before);

        // Queue empty: also a no-op
        let d = &dispatches[0];
        let next = c.on_worker_success(&d.path, d.generation, String::new());
        assert_eq!(next.len(), 1);
        let d = &next[0];
        let next = c.on_worker_success(&d.path, d.generation, String::new());
        assert!(next.is_empty());
        let before = states(&c);
        assert!(c.dispatch_next().is_empty());
        assert_eq!(states(&c), before);
    }

    #[test]
    fn test_fifo_order_with_single_worker() {
        let mut c = coordinator(1);
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            c.enqueue(path(name)).unwrap();
        }

        let mut order = Vec::new();
        let mut dispatches = c.start_processing(config());
        while let Some(d) = dispatches.pop() {
            order.push(d.path.clone());
            dispatches = c.on_worker_success(&d.path, d.generation, String::new());
        }

        assert_eq!(order, vec![path("a.mp3"), path("b.mp3"), path("c.mp3")]);
    }

    #[test]
    fn test_delete_processing_job_drops_orphan_completion() {
        let mut c = coordinator(1);
        c.enqueue(path("a.mp3")).unwrap();
        c.enqueue(path("b.mp3")).unwrap();
        let dispatches = c.start_processing(config());
        let orphan = dispatches[0].clone();

        // Deleting the processing job frees its slot and launches the
        // queued replacement immediately.
        let replacement = c.delete(&orphan.path).unwrap();
        assert_eq!(replacement.len(), 1);
        assert_eq!(replacement[0].path, path("b.mp3"));
        assert!(c.job(&orphan.path).is_none());

        // The orphaned worker's late result must not reintroduce the
        // job or disturb any other job.
        let next = c.on_worker_success(&orphan.path, orphan.generation, "late".to_string());
        assert!(next.is_empty());
        assert!(c.job(&orphan.path).is_none());
        assert_eq!(c.job(&path("b.mp3")).unwrap().state, JobState::Processing);
        assert_eq!(c.active_count(), 1);
    }

    #[test]
    fn test_delete_queued_job_is_skipped_at_dispatch() {
        let mut c = coordinator(1);
        c.enqueue(path("a.mp3")).unwrap();
        c.enqueue(path("b.mp3")).unwrap();
        c.enqueue(path("c.mp3")).unwrap();
        let dispatches = c.start_processing(config());

        c.delete(&path("b.mp3")).unwrap();

        let d = &dispatches[0];
        let next = c.on_worker_success(&d.path, d.generation, String::new());
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].path, path("c.mp3"));
    }

    #[test]
    fn test_reprocess_rules() {
        let mut c = coordinator(1);
        c.enqueue(path("a.mp3")).unwrap();

        // No run started yet
        assert!(matches!(
            c.reprocess(&path("a.mp3")),
            Err(CoreError::ConfigMissing)
        ));

        let dispatches = c.start_processing(config());
        let d = dispatches[0].clone();

        // Rejected while processing, without side effects
        assert!(matches!(
            c.reprocess(&path("a.mp3")),
            Err(CoreError::JobProcessing(_))
        ));
        assert_eq!(c.job(&path("a.mp3")).unwrap().state, JobState::Processing);

        // Done -> Queued -> Processing again
        c.on_worker_success(&d.path, d.generation, "v1".to_string());
        assert_eq!(c.job(&path("a.mp3")).unwrap().state, JobState::Done);

        let redo = c.reprocess(&path("a.mp3")).unwrap();
        assert_eq!(redo.len(), 1);
        assert_eq!(c.job(&path("a.mp3")).unwrap().state, JobState::Processing);
        assert!(c.job(&path("a.mp3")).unwrap().result_text.is_none());

        // Unknown path
        assert!(matches!(
            c.reprocess(&path("missing.mp3")),
            Err(CoreError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_reprocess_queued_job_does_not_duplicate() {
        let mut c = coordinator(1);
        c.enqueue(path("a.mp3")).unwrap();
        c.enqueue(path("b.mp3")).unwrap();
        c.start_processing(config());

        assert_eq!(c.pending_count(), 1);
        assert!(c.reprocess(&path("b.mp3")).unwrap().is_empty());
        assert_eq!(c.pending_count(), 1);
    }

    #[test]
    fn test_stale_generation_is_dropped_after_reprocess() {
        let mut c = coordinator(1);
        c.enqueue(path("a.mp3")).unwrap();
        let first = c.start_processing(config())[0].clone();

        c.on_worker_failure(&first.path, first.generation, "boom".to_string());
        let second = c.reprocess(&path("a.mp3")).unwrap()[0].clone();
        assert_ne!(first.generation, second.generation);

        // A duplicate message from the first run must not complete the
        // second run's worker.
        let next = c.on_worker_success(&first.path, first.generation, "old".to_string());
        assert!(next.is_empty());
        assert_eq!(c.job(&path("a.mp3")).unwrap().state, JobState::Processing);
        assert_eq!(c.active_count(), 1);
    }

    #[test]
    fn test_set_concurrency_applies_at_next_dispatch() {
        let mut c = coordinator(2);
        for name in ["a.mp3", "b.mp3", "c.mp3", "d.mp3"] {
            c.enqueue(path(name)).unwrap();
        }
        let dispatches = c.start_processing(config());
        assert_eq!(dispatches.len(), 2);

        // Lowering the limit never preempts running workers
        c.set_concurrency(1);
        assert_eq!(c.active_count(), 2);

        // But the next completion does not refill the freed slot
        let d = &dispatches[0];
        let next = c.on_worker_success(&d.path, d.generation, String::new());
        assert!(next.is_empty());
        assert_eq!(c.active_count(), 1);

        // Raising it fills slots again
        c.set_concurrency(3);
        let refill = c.dispatch_next();
        assert_eq!(refill.len(), 2);
        assert_eq!(c.active_count(), 3);
    }

    #[test]
    fn test_set_concurrency_is_clamped() {
        let mut c = Coordinator::with_bound(2, 4);
        c.set_concurrency(0);
        assert_eq!(c.max_concurrency(), 1);
        c.set_concurrency(100);
        assert_eq!(c.max_concurrency(), 4);
    }

    #[test]
    fn test_events_reflect_lifecycle() {
        let mut c = coordinator(1);
        let mut rx = c.take_event_receiver().unwrap();

        c.enqueue(path("a.mp3")).unwrap();
        let d = c.start_processing(config())[0].clone();
        c.on_worker_success(&d.path, d.generation, "text".to_string());
        c.delete(&path("a.mp3")).unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert!(matches!(
            seen[0],
            JobEvent::StateChanged {
                state: JobState::Unprocessed,
                ..
            }
        ));
        assert!(matches!(
            seen[1],
            JobEvent::StateChanged {
                state: JobState::Queued,
                ..
            }
        ));
        assert!(matches!(
            seen[2],
            JobEvent::StateChanged {
                state: JobState::Processing,
                ..
            }
        ));
        assert!(matches!(seen[3], JobEvent::Completed { .. }));
        assert!(matches!(seen[4], JobEvent::Removed { .. }));
    }
}
