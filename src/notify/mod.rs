//! Webhook notification dispatch
//!
//! Fired for each stored error after commit. Dispatch is fire-and-forget:
//! failures are logged and never block ingestion or surface to the client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;

use crate::db;
use crate::domain::{ErrorEvent, Project};

/// Dispatches Slack/webhook notifications for stored errors
pub struct Notifier {
    pool: SqlitePool,
    client: reqwest::Client,
    /// Last dispatch per project, for rate limiting
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl Notifier {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            pool,
            client: reqwest::Client::new(),
            last_sent: Mutex::new(HashMap::new()),
        })
    }

    /// Schedule notification delivery for one stored event
    pub fn dispatch(self: &Arc<Self>, project: Project, event: ErrorEvent) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&project, &event).await {
                tracing::warn!("Notification dispatch failed for project {}: {}", project.id, e);
            }
        });
    }

    async fn deliver(&self, project: &Project, event: &ErrorEvent) -> Result<(), sqlx::Error> {
        let settings = db::get_project_settings(&self.pool, &project.id).await?;

        if !settings.notification_enabled {
            return Ok(());
        }
        if !settings.level_enabled(&event.level.to_string()) {
            return Ok(());
        }
        if !self.rate_limit_allows(&project.id, settings.notification_rate_limit) {
            tracing::debug!("Notification rate limit active for project {}", project.id);
            return Ok(());
        }

        let globals = db::get_all_settings(&self.pool).await?;

        if let Some(webhook) = globals.get("slack_webhook").filter(|w| !w.is_empty()) {
            let text = format!(
                "*Pulse Alert:* New error in project *{}*\n> {}",
                project.name, event.message
            );
            self.post(webhook, &serde_json::json!({ "text": text })).await;
        }

        if let Some(webhook) = globals.get("generic_webhook").filter(|w| !w.is_empty()) {
            self.post(webhook, event).await;
        }

        if !settings.notification_webhook_url.is_empty() {
            self.post(&settings.notification_webhook_url, event).await;
        }

        Ok(())
    }

    /// Record the dispatch time; false when still inside the rate window
    fn rate_limit_allows(&self, project_id: &str, rate_limit_minutes: i64) -> bool {
        if rate_limit_minutes <= 0 {
            return true;
        }
        let window = Duration::from_secs(rate_limit_minutes as u64 * 60);
        let mut last_sent = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match last_sent.get(project_id) {
            Some(last) if now.duration_since(*last) < window => false,
            _ => {
                last_sent.insert(project_id.to_string(), now);
                true
            }
        }
    }

    async fn post<T: serde::Serialize>(&self, url: &str, body: &T) {
        match self.client.post(url).json(body).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!("Webhook {} answered {}", url, response.status());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to send webhook to {}: {}", url, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_rate_limit_window() {
        let pool = test_pool().await;
        let notifier = Notifier::new(pool);

        assert!(notifier.rate_limit_allows("p1", 60));
        assert!(!notifier.rate_limit_allows("p1", 60));
        // Other projects are tracked independently
        assert!(notifier.rate_limit_allows("p2", 60));
    }

    #[tokio::test]
    async fn test_zero_rate_limit_always_allows() {
        let pool = test_pool().await;
        let notifier = Notifier::new(pool);

        assert!(notifier.rate_limit_allows("p1", 0));
        assert!(notifier.rate_limit_allows("p1", 0));
    }
}
