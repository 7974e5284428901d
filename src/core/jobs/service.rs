//! Processing Service
//!
//! Owns the coordinator behind a mutex and turns its dispatch
//! decisions into spawned worker tasks. The lock is only held for
//! synchronous state transitions, never across an await; workers run
//! outside it and feed their single completion message back in.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{run_job, Coordinator, Dispatch, Job, JobEvent};
use crate::core::asr::EngineFactory;
use crate::core::ffmpeg::Transcoder;
use crate::core::settings::ProcessingConfig;
use crate::core::CoreResult;

#[derive(Clone)]
pub struct ProcessingService {
    coordinator: Arc<Mutex<Coordinator>>,
    transcoder: Arc<dyn Transcoder>,
    engines: Arc<dyn EngineFactory>,
}

impl ProcessingService {
    pub fn new(
        coordinator: Coordinator,
        transcoder: Arc<dyn Transcoder>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            transcoder,
            engines,
        }
    }

    /// Takes the job event receiver (can only be called once)
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        self.coordinator.lock().unwrap().take_event_receiver()
    }

    pub fn enqueue(&self, path: PathBuf) -> CoreResult<()> {
        self.coordinator.lock().unwrap().enqueue(path)
    }

    /// Starts a processing run over every unprocessed job
    pub fn start(&self, config: ProcessingConfig) {
        let dispatches = self.coordinator.lock().unwrap().start_processing(config);
        self.execute(dispatches);
    }

    pub fn reprocess(&self, path: &Path) -> CoreResult<()> {
        let dispatches = self.coordinator.lock().unwrap().reprocess(path)?;
        self.execute(dispatches);
        Ok(())
    }

    pub fn delete(&self, path: &Path) -> CoreResult<()> {
        let dispatches = self.coordinator.lock().unwrap().delete(path)?;
        self.execute(dispatches);
        Ok(())
    }

    pub fn set_concurrency(&self, n: usize) {
        self.coordinator.lock().unwrap().set_concurrency(n);
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.coordinator.lock().unwrap().jobs().to_vec()
    }

    pub fn job(&self, path: &Path) -> Option<Job> {
        self.coordinator.lock().unwrap().job(path).cloned()
    }

    /// Whether no work is queued or in flight
    pub fn is_drained(&self) -> bool {
        self.coordinator.lock().unwrap().is_drained()
    }

    /// Spawns one worker task per dispatch. Each completion feeds its
    /// result back to the coordinator and executes whatever the freed
    /// slot pulls in next.
    fn execute(&self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            let service = self.clone();
            tokio::spawn(async move {
                let Dispatch {
                    path,
                    generation,
                    config,
                } = dispatch;
                let result =
                    run_job(&path, &config, &service.transcoder, &service.engines).await;

                let next = {
                    let mut coordinator = service.coordinator.lock().unwrap();
                    match result {
                        Ok(text) => coordinator.on_worker_success(&path, generation, text),
                        Err(e) => {
                            coordinator.on_worker_failure(&path, generation, e.to_string())
                        }
                    }
                };
                service.execute(next);
            });
        }
    }
}
