//! Application state shared across handlers

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::notify::Notifier;
use crate::workers::{spawn_batch_writer, BatchSender};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub batch: BatchSender,
    pub notifier: Arc<Notifier>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the state and start the batched writer behind it
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let notifier = Notifier::new(pool.clone());
        let batch = spawn_batch_writer(pool.clone(), Arc::clone(&notifier));

        Self {
            pool,
            batch,
            notifier,
            config: Arc::new(config),
        }
    }
}
