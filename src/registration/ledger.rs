//! Registration ledger.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{now_unix, RegisteredService, Section};
use crate::repository::SectionRepository;

/// A fan-out target and the section whose token authenticates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    pub url: String,
    pub section: String,
}

/// What a stale sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub sections_modified: usize,
    pub services_removed: usize,
    pub clients_removed: usize,
}

pub struct RegistrationLedger {
    repository: Arc<SectionRepository>,
}

impl RegistrationLedger {
    pub fn new(repository: Arc<SectionRepository>) -> Self {
        Self { repository }
    }

    /// Upsert `service` into section `component_name`, creating the section
    /// if needed. An existing entry for the same subscriber is replaced.
    pub async fn register(
        &self,
        component_name: &str,
        friendly_name: &str,
        mut service: RegisteredService,
    ) -> ConfigResult<Section> {
        if component_name.trim().is_empty() {
            return Err(ConfigError::InvalidRequest("component name must not be blank".into()));
        }
        let now = now_unix();
        service.last_updated = now;
        if service.component_name.is_empty() {
            service.component_name = component_name.to_string();
        }

        tracing::info!(
            section = %component_name,
            url = %service.callback_base_url,
            client_id = %service.subscriber_client_id,
            "Service registered"
        );
        Ok(self
            .repository
            .store()
            .upsert_service(component_name, friendly_name, service, now)
            .await?)
    }

    /// Distinct non-empty callback URLs, each with the first section that
    /// registered it.
    pub async fn list_listeners(&self) -> ConfigResult<Vec<Listener>> {
        let mut seen = HashSet::new();
        let mut listeners = Vec::new();
        for section in self.repository.list_full().await? {
            for service in &section.services {
                let url = service.callback_base_url.trim();
                if url.is_empty() || !seen.insert(url.to_string()) {
                    continue;
                }
                listeners.push(Listener {
                    url: url.to_string(),
                    section: section.name.clone(),
                });
            }
        }
        Ok(listeners)
    }

    pub async fn list_listener_urls(&self) -> ConfigResult<Vec<String>> {
        Ok(self.list_listeners().await?.into_iter().map(|l| l.url).collect())
    }

    /// Record that `client_id` read `section`.
    pub async fn log_activity(&self, section_name: &str, client_id: &str) -> ConfigResult<()> {
        if client_id.is_empty() {
            return Ok(());
        }
        let found = self
            .repository
            .store()
            .record_client_activity(section_name, client_id, now_unix())
            .await?;
        if !found {
            return Err(ConfigError::section_missing(section_name));
        }
        Ok(())
    }

    pub async fn sweep_stale(&self, threshold_secs: u64) -> ConfigResult<SweepReport> {
        self.sweep_stale_at(threshold_secs, now_unix()).await
    }

    /// Remove services and clients idle for longer than `threshold_secs`
    /// as of `now`. A service whose client went stale goes with it.
    ///
    /// Each section is filtered inside one store update, so registrations
    /// landing during the sweep are kept.
    pub async fn sweep_stale_at(&self, threshold_secs: u64, now: u64) -> ConfigResult<SweepReport> {
        let mut report = SweepReport::default();

        for section in self.repository.list().await? {
            // One section failing does not stop the sweep.
            let removed = self
                .repository
                .store()
                .remove_stale_registrations(&section.name, threshold_secs, now)
                .await;
            let (services_removed, clients_removed) = match removed {
                Ok(Some(counts)) => counts,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(section = %section.name, error = %e, "Failed to sweep section");
                    continue;
                }
            };
            if services_removed == 0 && clients_removed == 0 {
                continue;
            }

            tracing::info!(
                section = %section.name,
                services_removed,
                clients_removed,
                "Removed stale registrations"
            );
            report.sections_modified += 1;
            report.services_removed += services_removed;
            report.clients_removed += clients_removed;
        }

        Ok(report)
    }
}
