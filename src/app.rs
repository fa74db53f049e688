//! Service facade.
//!
//! Every HTTP handler goes through [`ConfigService`]; background workers
//! share its dispatcher and ledger.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EnvironmentConfig, ServiceConfig};
use crate::error::{ConfigError, ConfigResult, StartupError};
use crate::identity::TokenIssuer;
use crate::model::{QueueStats, RegisteredService, Section, SettingsValue};
use crate::notifications::{Coordinator, NotificationDispatcher, Role};
use crate::registration::{Listener, RegistrationLedger};
use crate::repository::{SectionRepository, ValueStore};
use crate::store::{SectionStore, TaskStore};
use crate::sync::{parse_sections, DiffEngine, DiffReport, MergeEngine, MergeOutcome, PeerClient};

/// Snapshot for `/admin/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub version: &'static str,
    pub environment: String,
    pub deployment_id: String,
    pub instance_id: String,
    pub role: Role,
    pub sections: usize,
    pub listeners: usize,
    pub queue: QueueStats,
}

pub struct ConfigService {
    repository: Arc<SectionRepository>,
    values: ValueStore,
    diff: DiffEngine,
    merge: MergeEngine,
    peers: PeerClient,
    ledger: Arc<RegistrationLedger>,
    dispatcher: Arc<NotificationDispatcher>,
    coordinator: Arc<dyn Coordinator>,
    environment: EnvironmentConfig,
}

impl ConfigService {
    /// Wire every component over one store. Well-known sections are
    /// created here.
    pub async fn build<S>(
        config: &ServiceConfig,
        store: Arc<S>,
        issuer: Arc<dyn TokenIssuer>,
        coordinator: Arc<dyn Coordinator>,
    ) -> Result<Self, StartupError>
    where
        S: SectionStore + TaskStore + 'static,
    {
        let repository = Arc::new(SectionRepository::new(store.clone(), issuer).await?);
        let ledger = Arc::new(RegistrationLedger::new(repository.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store,
            ledger.clone(),
            repository.clone(),
            coordinator.clone(),
            config.notifications.clone(),
        )?);

        let timeout = Duration::from_secs(config.peers.timeout_secs);
        let peers = PeerClient::new(config.environment.shared_secret.clone(), timeout)?;

        Ok(Self {
            values: ValueStore::new(repository.store().clone()),
            diff: DiffEngine::new(peers.clone(), config.environment.name.clone()),
            merge: MergeEngine::new(repository.clone()),
            peers,
            repository,
            ledger,
            dispatcher,
            coordinator,
            environment: config.environment.clone(),
        })
    }

    pub fn repository(&self) -> &Arc<SectionRepository> {
        &self.repository
    }

    pub fn ledger(&self) -> &Arc<RegistrationLedger> {
        &self.ledger
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    /// One section, including its services and active clients.
    pub async fn get_section(&self, name: &str) -> ConfigResult<Section> {
        self.repository.find_by_name(name).await
    }

    pub async fn list_sections(&self) -> ConfigResult<Vec<Section>> {
        self.repository.list().await
    }

    /// Section name → values, for one section or all of them. Reads by a
    /// known client are recorded as activity.
    pub async fn client_view(
        &self,
        name: Option<&str>,
        client_id: Option<&str>,
    ) -> ConfigResult<BTreeMap<String, BTreeMap<String, SettingsValue>>> {
        let sections = match name.filter(|n| !n.is_empty()) {
            Some(name) => vec![self.get_section(name).await?],
            None => self.list_sections().await?,
        };

        if let Some(client_id) = client_id.filter(|c| !c.is_empty()) {
            for section in &sections {
                if let Err(e) = self.ledger.log_activity(&section.name, client_id).await {
                    tracing::warn!(section = %section.name, client_id = %client_id, error = %e, "Failed to log activity");
                }
            }
        }

        Ok(sections.into_iter().map(|s| (s.name, s.data)).collect())
    }

    /// Create a section. `Ok(false)` when it already existed.
    pub async fn create_section(&self, name: &str, friendly_name: &str) -> ConfigResult<bool> {
        match self.repository.create(name, friendly_name).await {
            Ok(_) => Ok(true),
            Err(ConfigError::DuplicateName(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_section(&self, name: &str) -> ConfigResult<bool> {
        self.repository.delete(name).await
    }

    /// Write one value and ask for subscribers to be refreshed. The write
    /// stands even if the fan-out request fails.
    pub async fn update_value(&self, section: &str, key: &str, value: Value, comment: &str) -> ConfigResult<Section> {
        let updated = self.values.set(section, key, value, comment).await?;
        self.request_fanout().await;
        Ok(updated.projected())
    }

    pub async fn remove_value(&self, section: &str, key: &str) -> ConfigResult<bool> {
        let removed = self.values.remove(section, key).await?;
        if removed {
            self.request_fanout().await;
        }
        Ok(removed)
    }

    pub async fn generate_admin_token(&self, section: &str) -> ConfigResult<String> {
        self.repository.generate_admin_token(section).await
    }

    /// True if `token` is the section's persisted admin token.
    pub async fn is_section_token(&self, section: &str, token: &str) -> ConfigResult<bool> {
        let section = self.repository.find_by_name(section).await?;
        Ok(section.admin_token.as_deref() == Some(token))
    }

    pub fn shared_secret_matches(&self, candidate: &str) -> bool {
        !candidate.is_empty() && candidate == self.environment.shared_secret
    }

    /// Local sections as peers receive them.
    pub async fn export_sections(&self) -> ConfigResult<Vec<Section>> {
        Ok(self
            .repository
            .list()
            .await?
            .iter()
            .map(Section::prepared_for_export)
            .collect())
    }

    /// Peers to diff against: the requested URLs, or the configured peers
    /// when none were given and `use_configured` is set.
    pub fn diff_targets(&self, requested: Vec<String>, use_configured: bool) -> Vec<String> {
        if requested.is_empty() && use_configured {
            self.environment.peers.clone()
        } else {
            requested
        }
    }

    /// Diff this environment against `environments` (peer base URLs).
    pub async fn compute_diff(&self, environments: &[String], filter: Option<&str>) -> ConfigResult<DiffReport> {
        let local = self.export_sections().await?;
        Ok(self.diff.diff_with_peers(local, environments, filter).await)
    }

    /// Merge raw sections from `deployment_id`. Malformed entries are
    /// skipped.
    pub async fn merge_sections(&self, raw: Vec<Value>, deployment_id: &str) -> ConfigResult<MergeOutcome> {
        let incoming = parse_sections(raw);
        let outcome = self.merge.merge(incoming, deployment_id).await?;
        if outcome.values_added > 0 {
            self.request_fanout().await;
        }
        Ok(outcome)
    }

    /// Push local sections into the peer at `env_url`.
    pub async fn export_to(&self, env_url: &str) -> ConfigResult<MergeOutcome> {
        if url::Url::parse(env_url).is_err() {
            return Err(ConfigError::InvalidRequest(format!("'{}' is not a URL", env_url)));
        }
        let sections = self.export_sections().await?;
        let outcome = self
            .peers
            .push_import(env_url, &self.environment.deployment_id, &sections)
            .await?;
        tracing::info!(
            peer = %env_url,
            sections_affected = outcome.sections_affected,
            values_added = outcome.values_added,
            "Export complete"
        );
        Ok(outcome)
    }

    pub async fn register(
        &self,
        component_name: &str,
        friendly_name: &str,
        service: RegisteredService,
    ) -> ConfigResult<Section> {
        self.ledger.register(component_name, friendly_name, service).await
    }

    pub async fn list_listener_urls(&self) -> ConfigResult<Vec<String>> {
        self.ledger.list_listener_urls().await
    }

    pub async fn list_listeners(&self) -> ConfigResult<Vec<Listener>> {
        self.ledger.list_listeners().await
    }

    pub async fn queue_stats(&self) -> ConfigResult<QueueStats> {
        self.dispatcher.queue_stats().await
    }

    pub async fn status(&self) -> ConfigResult<ServiceStatus> {
        Ok(ServiceStatus {
            version: env!("CARGO_PKG_VERSION"),
            environment: self.environment.name.clone(),
            deployment_id: self.environment.deployment_id.clone(),
            instance_id: self.coordinator.instance_id().to_string(),
            role: self.coordinator.role(),
            sections: self.repository.list().await?.len(),
            listeners: self.ledger.list_listeners().await?.len(),
            queue: self.dispatcher.queue_stats().await?,
        })
    }

    async fn request_fanout(&self) {
        if let Err(e) = self.dispatcher.request_fanout().await {
            tracing::warn!(error = %e, "Failed to request subscriber refresh");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DisabledIssuer;
    use crate::notifications::StaticCoordinator;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn setup() -> (ConfigService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(None));
        let service = ConfigService::build(
            &ServiceConfig::default(),
            store.clone(),
            Arc::new(DisabledIssuer),
            Arc::new(StaticCoordinator::new("node-1", true)),
        )
        .await
        .unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn test_well_known_sections_exist() {
        let (service, _) = setup().await;
        let names: Vec<String> = service.list_sections().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["client", "common", "global", "server"]);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_soft() {
        let (service, _) = setup().await;
        assert!(service.create_section("billing", "Billing").await.unwrap());
        assert!(!service.create_section("billing", "Billing").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_requests_fanout() {
        let (service, store) = setup().await;
        service.update_value("global", "motd", json!("hello"), "greeting").await.unwrap();
        assert!(store.take_fanout_request().await.unwrap().is_some());

        let err = service.update_value("global", "motd", json!({"a": 1}), "").await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValueType { .. }));
        assert!(store.take_fanout_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_absent_key_changes_nothing() {
        let (service, store) = setup().await;
        let before = service.get_section("global").await.unwrap().updated_on;
        assert!(!service.remove_value("global", "missing").await.unwrap());
        assert_eq!(service.get_section("global").await.unwrap().updated_on, before);
        assert!(store.take_fanout_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_view_records_activity() {
        let (service, store) = setup().await;
        service.update_value("client", "fps", json!(60), "").await.unwrap();

        let view = service.client_view(Some("client"), Some("launcher-1")).await.unwrap();
        assert_eq!(view.len(), 1);
        assert!(view["client"].contains_key("fps"));

        let stored = store.find_by_name("client").await.unwrap().unwrap();
        assert_eq!(stored.active_clients[0].client_id, "launcher-1");

        let single = service.get_section("client").await.unwrap();
        assert_eq!(single.active_clients.len(), 1);
        assert!(service
            .list_sections()
            .await
            .unwrap()
            .iter()
            .all(|s| s.active_clients.is_empty()));
    }

    #[tokio::test]
    async fn test_merge_requests_fanout_only_when_values_added() {
        let (service, store) = setup().await;
        let raw = vec![json!({"name": "global", "data": {"motd": {"value": "hi"}}})];

        let outcome = service.merge_sections(raw.clone(), "9").await.unwrap();
        assert_eq!(outcome.values_added, 1);
        assert!(store.take_fanout_request().await.unwrap().is_some());

        let outcome = service.merge_sections(raw, "9").await.unwrap();
        assert_eq!(outcome.values_added, 0);
        assert!(store.take_fanout_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_export_rejects_bad_url() {
        let (service, _) = setup().await;
        let err = service.export_to("not a url").await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_diff_targets_fall_back_to_configured_peers() {
        let store = Arc::new(MemoryStore::new(None));
        let mut config = ServiceConfig::default();
        config.environment.peers = vec!["http://prod:8080".into()];
        let service = ConfigService::build(
            &config,
            store,
            Arc::new(DisabledIssuer),
            Arc::new(StaticCoordinator::new("node-1", true)),
        )
        .await
        .unwrap();

        let explicit = vec!["http://qa:8080".to_string()];
        assert_eq!(service.diff_targets(explicit.clone(), true), explicit);
        assert_eq!(service.diff_targets(Vec::new(), true), vec!["http://prod:8080".to_string()]);
        assert!(service.diff_targets(Vec::new(), false).is_empty());
    }

    #[tokio::test]
    async fn test_shared_secret() {
        let (service, _) = setup().await;
        assert!(service.shared_secret_matches("CHANGE_ME_IN_PRODUCTION"));
        assert!(!service.shared_secret_matches("wrong"));
        assert!(!service.shared_secret_matches(""));
    }
}
