//! Parallel update workers drawn from the job queue.

use std::{fs, io, sync::Arc, thread, time::Duration};

use tracing::{error, warn};

use crate::{
    constants::RETRY_BACKOFF_SECS,
    error::PodiumError,
    queue::{DelayedQueue, Job, JobQueue},
    services::Services,
    update::UpdateEngine,
};

/// A pool of threads draining a [`DelayedQueue`].
///
/// Each worker processes one job at a time; per-package mutual exclusion
/// is enforced by the engine's advisory lock, so two workers picking up
/// the same package serialize rather than race.
pub struct WorkerPool {
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the configured number of workers.
    pub fn spawn_default(services: Services, queue: Arc<DelayedQueue>) -> Self {
        let count = services.config.worker_count;
        Self::spawn(services, queue, count)
    }

    pub fn spawn(services: Services, queue: Arc<DelayedQueue>, count: usize) -> Self {
        let handles = (0..count.max(1))
            .map(|i| {
                let services = services.clone();
                let queue = queue.clone();
                thread::Builder::new()
                    .name(format!("podium-worker-{i}"))
                    .spawn(move || worker_loop(services, queue))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { handles }
    }

    /// Waits for all workers to exit; call [`DelayedQueue::close`] first.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(services: Services, queue: Arc<DelayedQueue>) {
    while let Some(job) = queue.pop() {
        handle_job(&services, &queue, job);
    }
}

pub(crate) fn handle_job(services: &Services, queue: &Arc<DelayedQueue>, job: Job) {
    match job {
        Job::UpdatePackage { name } => {
            match UpdateEngine::new(services).update_package(&name, false) {
                Ok(()) => {}
                Err(PodiumError::VcsTransient(reason)) => {
                    warn!("Transient failure updating {name}, retrying later: {reason}");
                    queue.enqueue_delayed(
                        Job::UpdatePackage { name },
                        Duration::from_secs(RETRY_BACKOFF_SECS),
                    );
                }
                Err(PodiumError::StoreConflict) => {
                    // The concurrent winner left the store consistent; a
                    // plain re-run reconciles against its result.
                    queue.enqueue(Job::UpdatePackage { name });
                }
                Err(err) => {
                    error!("Update of {name} failed: {err}");
                }
            }
        }
        Job::DeletePaths { paths } => {
            for path in paths {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => warn!("Failed to delete {}: {err}", path.display()),
                }
            }
        }
    }
}
