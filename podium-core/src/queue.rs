//! Job queue interface and in-memory implementations.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    path::PathBuf,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Reconcile a package against its VCS backend. Idempotent: a re-run
    /// simply reconciles again.
    UpdatePackage { name: String },
    /// Remove superseded provider files. Idempotent: the files may already
    /// be gone.
    DeletePaths { paths: Vec<PathBuf> },
}

/// Trait for enqueuing jobs.
///
/// Each deployment provides its own transport; the registry only needs
/// delayed enqueue.
pub trait JobQueue: Send + Sync {
    fn enqueue_delayed(&self, job: Job, delay: Duration);

    fn enqueue(&self, job: Job) {
        self.enqueue_delayed(job, Duration::ZERO);
    }
}

/// No-op queue for callers that do not cascade.
pub struct NullQueue;

impl JobQueue for NullQueue {
    fn enqueue_delayed(&self, _job: Job, _delay: Duration) {}
}

/// Collector queue that stores enqueued jobs for inspection.
///
/// Useful in tests to verify that expected follow-up jobs were scheduled.
#[derive(Default)]
pub struct CollectorQueue {
    jobs: Mutex<Vec<(Job, Duration)>>,
}

impl CollectorQueue {
    pub fn jobs(&self) -> Vec<(Job, Duration)> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobQueue for CollectorQueue {
    fn enqueue_delayed(&self, job: Job, delay: Duration) {
        self.jobs.lock().unwrap().push((job, delay));
    }
}

struct Scheduled {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // BinaryHeap is a max-heap; reverse so the earliest due job pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
    closed: bool,
}

/// In-process delayed queue drained by [`crate::worker::WorkerPool`].
///
/// Jobs become visible to `pop` once their delay has elapsed; `pop` blocks
/// until a job is due or the queue is closed.
#[derive(Default)]
pub struct DelayedQueue {
    state: Mutex<QueueState>,
    condvar: Condvar,
}

impl DelayedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until a job is due. Returns `None` once the queue is closed
    /// and drained.
    pub fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(next) = state.heap.peek() {
                let now = Instant::now();
                if next.due <= now {
                    return state.heap.pop().map(|scheduled| scheduled.job);
                }
                if state.closed {
                    return None;
                }
                let wait = next.due - now;
                let (next_state, _) = self.condvar.wait_timeout(state, wait).unwrap();
                state = next_state;
            } else {
                if state.closed {
                    return None;
                }
                state = self.condvar.wait(state).unwrap();
            }
        }
    }

    /// Closes the queue: pending delayed jobs are abandoned and blocked
    /// `pop` calls return.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.condvar.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobQueue for DelayedQueue {
    fn enqueue_delayed(&self, job: Job, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Scheduled {
            due: Instant::now() + delay,
            seq,
            job,
        });
        drop(state);
        self.condvar.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_collector_queue() {
        let queue = CollectorQueue::default();
        assert!(queue.is_empty());

        queue.enqueue(Job::UpdatePackage {
            name: "psr/log".to_string(),
        });
        queue.enqueue_delayed(
            Job::DeletePaths {
                paths: vec![PathBuf::from("/tmp/old.json")],
            },
            Duration::from_secs(300),
        );

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].1, Duration::ZERO);
        assert_eq!(jobs[1].1, Duration::from_secs(300));
    }

    #[test]
    fn test_delayed_queue_orders_by_due_time() {
        let queue = DelayedQueue::new();
        queue.enqueue_delayed(
            Job::UpdatePackage {
                name: "later".to_string(),
            },
            Duration::from_millis(50),
        );
        queue.enqueue(Job::UpdatePackage {
            name: "now".to_string(),
        });

        assert_eq!(
            queue.pop(),
            Some(Job::UpdatePackage {
                name: "now".to_string()
            })
        );
        assert_eq!(
            queue.pop(),
            Some(Job::UpdatePackage {
                name: "later".to_string()
            })
        );
    }

    #[test]
    fn test_delayed_queue_fifo_within_same_instant() {
        let queue = DelayedQueue::new();
        for name in ["a", "b", "c"] {
            queue.enqueue(Job::UpdatePackage {
                name: name.to_string(),
            });
        }
        for name in ["a", "b", "c"] {
            assert_eq!(
                queue.pop(),
                Some(Job::UpdatePackage {
                    name: name.to_string()
                })
            );
        }
    }

    #[test]
    fn test_close_releases_blocked_pop() {
        let queue = Arc::new(DelayedQueue::new());
        let popper = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(popper.join().unwrap(), None);
    }

    #[test]
    fn test_pop_wakes_for_cross_thread_enqueue() {
        let queue = Arc::new(DelayedQueue::new());
        let popper = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(Job::UpdatePackage {
            name: "psr/log".to_string(),
        });
        assert_eq!(
            popper.join().unwrap(),
            Some(Job::UpdatePackage {
                name: "psr/log".to_string()
            })
        );
    }
}
