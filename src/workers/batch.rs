//! Batched durable writer for error events
//!
//! Producers enqueue events on a bounded channel; a single consumer task
//! coalesces them into batches and inserts each batch in one transaction,
//! followed by one counter update per affected project. A failed batch falls
//! back to one-by-one inserts so a single bad row cannot stall the pipeline.
//! The in-memory buffer is lost on abrupt shutdown; only committed events
//! are durable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::db;
use crate::domain::{ErrorEvent, Project};
use crate::notify::Notifier;

/// Channel capacity from producers to the writer
pub const CHANNEL_CAPACITY: usize = 1000;
/// Flush when this many events are buffered
const BATCH_SIZE: usize = 100;
/// Flush at least this often while events are pending
const BATCH_INTERVAL: Duration = Duration::from_millis(100);

/// One unit of work for the writer
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub event: ErrorEvent,
    pub project: Project,
}

pub type BatchSender = mpsc::Sender<BatchEntry>;

/// Spawn the writer task and hand back the producer side of its channel
pub fn spawn_batch_writer(pool: SqlitePool, notifier: Arc<Notifier>) -> BatchSender {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(run(pool, rx, notifier));
    tx
}

async fn run(pool: SqlitePool, mut rx: mpsc::Receiver<BatchEntry>, notifier: Arc<Notifier>) {
    tracing::info!("Starting error batch writer");

    let mut pending: Vec<BatchEntry> = Vec::new();
    let mut last_flush = Instant::now();
    let mut ticker = tokio::time::interval(BATCH_INTERVAL);

    loop {
        tokio::select! {
            entry = rx.recv() => {
                match entry {
                    Some(entry) => {
                        pending.push(entry);
                        if pending.len() >= BATCH_SIZE {
                            flush(&pool, &mut pending, &notifier).await;
                            last_flush = Instant::now();
                        }
                    }
                    // All senders dropped: drain and stop
                    None => {
                        flush(&pool, &mut pending, &notifier).await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if !pending.is_empty() && last_flush.elapsed() >= BATCH_INTERVAL {
                    flush(&pool, &mut pending, &notifier).await;
                    last_flush = Instant::now();
                }
            }
        }
    }
}

async fn flush(pool: &SqlitePool, pending: &mut Vec<BatchEntry>, notifier: &Arc<Notifier>) {
    if pending.is_empty() {
        return;
    }
    let batch: Vec<BatchEntry> = pending.drain(..).collect();

    match insert_batch(pool, &batch).await {
        Ok(stored) => {
            tracing::debug!("Batch inserted {} errors", stored.len());
            for index in stored {
                let entry = &batch[index];
                notifier.dispatch(entry.project.clone(), entry.event.clone());
            }
        }
        Err(e) => {
            tracing::warn!("Batch insert failed, retrying events one by one: {}", e);
            for entry in &batch {
                match db::insert_error(pool, &entry.event).await {
                    Ok(()) => notifier.dispatch(entry.project.clone(), entry.event.clone()),
                    Err(e) => {
                        tracing::error!("Failed to insert error {}: {}", entry.event.id, e);
                    }
                }
            }
        }
    }
}

/// Insert the whole batch in one transaction; returns the indices of the
/// entries that made it in. A row that fails to insert is skipped and does
/// not count against its project.
async fn insert_batch(pool: &SqlitePool, batch: &[BatchEntry]) -> Result<Vec<usize>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut project_counts: HashMap<&str, i64> = HashMap::new();
    let mut stored = Vec::with_capacity(batch.len());

    for (index, entry) in batch.iter().enumerate() {
        let result = db::bind_error(sqlx::query(db::INSERT_ERROR_SQL), &entry.event)
            .execute(&mut *tx)
            .await;
        match result {
            Ok(_) => {
                *project_counts.entry(entry.event.project_id.as_str()).or_default() += 1;
                stored.push(index);
            }
            Err(e) => {
                tracing::warn!("Failed to insert error {} in batch: {}", entry.event.id, e);
            }
        }
    }

    for (project_id, count) in project_counts {
        sqlx::query("UPDATE projects SET current_month_events = current_month_events + ? WHERE id = ?")
            .bind(count)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(stored)
}
