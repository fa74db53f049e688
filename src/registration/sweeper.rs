//! Periodic removal of stale registrations.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::RegistrationConfig;
use crate::observability::metrics;
use crate::registration::RegistrationLedger;

pub struct StaleSweeper {
    ledger: Arc<RegistrationLedger>,
    config: RegistrationConfig,
}

impl StaleSweeper {
    pub fn new(ledger: Arc<RegistrationLedger>, config: RegistrationConfig) -> Self {
        Self { ledger, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.sweep_enabled {
            tracing::info!("Stale registration sweep disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.sweep_interval_secs,
            threshold_secs = self.config.stale_threshold_secs,
            "Stale sweeper starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.sweep_interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.ledger.sweep_stale(self.config.stale_threshold_secs).await {
                        Ok(report) => {
                            metrics::record_stale_removed(report.services_removed + report.clients_removed);
                            tracing::debug!(
                                sections_modified = report.sections_modified,
                                services_removed = report.services_removed,
                                clients_removed = report.clients_removed,
                                "Sweep finished"
                            );
                        }
                        Err(e) => tracing::warn!(error = %e, "Stale sweep failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Stale sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
