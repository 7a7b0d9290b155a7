//! Explicit dependency container.
//!
//! Collaborators are passed as values constructed at process init rather
//! than reached through process-wide globals.

use std::sync::Arc;

use crate::{
    config::Config,
    database::{Database, Store},
    queue::{DelayedQueue, JobQueue},
    vcs::{GithubFactory, VcsAdapterFactory},
    PodiumResult,
};

#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub store: Store,
    pub queue: Arc<dyn JobQueue>,
    pub vcs: Arc<dyn VcsAdapterFactory>,
}

impl Services {
    pub fn new(
        config: Arc<Config>,
        store: Store,
        queue: Arc<dyn JobQueue>,
        vcs: Arc<dyn VcsAdapterFactory>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            vcs,
        }
    }

    /// Production wiring: SQLite store from the configured path, GitHub
    /// adapter factory and an in-process delayed queue. The queue is also
    /// returned directly so a worker pool can drain it.
    pub fn init(config: Config) -> PodiumResult<(Self, Arc<DelayedQueue>)> {
        let store = Store::new(Database::open(&config.db_path)?);
        let vcs = Arc::new(GithubFactory::from_config(&config));
        let queue = Arc::new(DelayedQueue::new());
        let services = Self::new(Arc::new(config), store, queue.clone(), vcs);
        Ok((services, queue))
    }
}
