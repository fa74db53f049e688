//! Notification queue worker.

use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::NotificationConfig;
use crate::error::ConfigResult;
use crate::model::{now_unix, NotificationTask, QueueStats};
use crate::notifications::role::{Coordinator, Role};
use crate::observability::metrics;
use crate::registration::RegistrationLedger;
use crate::repository::SectionRepository;
use crate::resilience::calculate_backoff;
use crate::store::TaskStore;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub enqueued: usize,
    pub reclaimed: usize,
    pub purged: usize,
    pub claimed: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationDispatcher {
    tasks: Arc<dyn TaskStore>,
    ledger: Arc<RegistrationLedger>,
    repository: Arc<SectionRepository>,
    coordinator: Arc<dyn Coordinator>,
    client: reqwest::Client,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        ledger: Arc<RegistrationLedger>,
        repository: Arc<SectionRepository>,
        coordinator: Arc<dyn Coordinator>,
        config: NotificationConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            tasks,
            ledger,
            repository,
            coordinator,
            client,
            config,
        })
    }

    pub fn role(&self) -> Role {
        self.coordinator.role()
    }

    /// Ask the primary to fan out on its next tick.
    pub async fn request_fanout(&self) -> ConfigResult<()> {
        self.tasks.request_fanout(now_unix()).await?;
        tracing::debug!("Fan-out requested");
        Ok(())
    }

    /// Create one task per listener URL that has none pending.
    pub async fn enqueue_notifications(&self) -> ConfigResult<usize> {
        let listeners = self.ledger.list_listeners().await?;
        let pending = self.tasks.pending_urls().await?;
        let now = now_unix();

        let mut enqueued = 0;
        for listener in listeners {
            if pending.contains(&listener.url) {
                continue;
            }
            self.tasks
                .create_task(NotificationTask::new(listener.url, listener.section, now))
                .await?;
            enqueued += 1;
        }

        tracing::info!(enqueued, skipped = pending.len(), "Enqueued notifications");
        Ok(enqueued)
    }

    pub async fn queue_stats(&self) -> ConfigResult<QueueStats> {
        Ok(self.tasks.queue_stats().await?)
    }

    /// Run one round of queue work for this instance's role.
    pub async fn tick(&self) -> ConfigResult<TickReport> {
        let now = now_unix();
        let role = self.coordinator.role();
        let mut report = TickReport::default();

        if role.can_enqueue() {
            if let Some(requested_at) = self.tasks.take_fanout_request().await? {
                match self.enqueue_notifications().await {
                    Ok(enqueued) => report.enqueued = enqueued,
                    Err(e) => {
                        // Put the marker back so the next tick retries.
                        self.tasks.request_fanout(requested_at).await?;
                        return Err(e);
                    }
                }
            }
            report.purged = self
                .tasks
                .purge_completed(now.saturating_sub(self.config.completed_retention_secs))
                .await?;
        }

        report.reclaimed = self
            .tasks
            .reclaim_abandoned(now.saturating_sub(self.config.abandoned_after_secs))
            .await?;
        if report.reclaimed > 0 {
            tracing::warn!(reclaimed = report.reclaimed, "Reclaimed abandoned notification tasks");
        }

        let capacity = match role {
            Role::Primary => self.config.primary_capacity,
            Role::Secondary => self.config.secondary_capacity,
        };
        if capacity > 0 {
            let claimed = self
                .tasks
                .claim_tasks(self.coordinator.instance_id(), capacity, now)
                .await?;
            report.claimed = claimed.len();

            let results = join_all(claimed.iter().map(|task| self.execute(task))).await;
            for (task, result) in claimed.iter().zip(results) {
                match result {
                    Ok(()) => {
                        self.tasks.complete_task(task.id, now_unix()).await?;
                        metrics::record_notification("delivered");
                        report.delivered += 1;
                    }
                    Err(reason) => {
                        let delay = calculate_backoff(
                            task.attempts + 1,
                            self.config.retry_base_delay_ms,
                            self.config.retry_max_delay_ms,
                        );
                        let not_before = now_unix() + delay.as_millis().div_ceil(1000) as u64;
                        tracing::warn!(
                            url = %task.url,
                            attempts = task.attempts + 1,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %reason,
                            "Couldn't refresh subscriber"
                        );
                        self.tasks.release_task(task.id, not_before, &reason).await?;
                        metrics::record_notification("failed");
                        report.failed += 1;
                    }
                }
            }
        }

        metrics::record_queue_depth(&self.tasks.queue_stats().await?);
        Ok(report)
    }

    /// Deliver one refresh. The section token is sent when one can be had.
    async fn execute(&self, task: &NotificationTask) -> Result<(), String> {
        let token = match self.repository.generate_admin_token(&task.section).await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(section = %task.section, error = %e, "No admin token for refresh");
                None
            }
        };

        let url = format!("{}/refresh", task.url.trim_end_matches('/'));
        tracing::debug!(url = %url, attempt = task.attempts + 1, "Sending refresh");

        let mut request = self.client.patch(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!("HTTP {}", response.status().as_u16())),
            Err(e) => Err(e.to_string()),
        }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Notification dispatcher disabled");
            return;
        }

        tracing::info!(
            instance = %self.coordinator.instance_id(),
            role = ?self.coordinator.role(),
            interval_ms = self.config.interval_ms,
            "Notification dispatcher starting"
        );

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(report) if report != TickReport::default() => {
                            tracing::debug!(?report, "Dispatcher tick");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Dispatcher tick failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Notification dispatcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
