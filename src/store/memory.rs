//! In-process document store with JSON snapshot persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{SectionStore, StoreError, StoreResult, TaskStore};
use crate::model::{
    ActiveClient, NotificationTask, QueueStats, RegisteredService, Section, SettingsValue, TaskState,
};

fn snapshot_tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// On-disk layout of a snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    sections: Vec<Section>,
    tasks: Vec<NotificationTask>,
    #[serde(default)]
    fanout_requested: Option<u64>,
}

/// Thread-safe store keeping every document in memory.
///
/// Each DashMap entry is one document; entry locks give the per-document
/// serialization a document database would provide.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Sections keyed by their unique name.
    sections: DashMap<String, Section>,
    tasks: DashMap<Uuid, NotificationTask>,
    /// Unix second of the pending fan-out request, 0 when none.
    fanout_requested: AtomicU64,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            persistence_path,
            ..Default::default()
        }
    }

    /// Load from a snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> StoreResult<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;

            for section in snapshot.sections {
                store.sections.insert(section.name.clone(), section);
            }
            for task in snapshot.tasks {
                store.tasks.insert(task.id, task);
            }
            store
                .fanout_requested
                .store(snapshot.fanout_requested.unwrap_or(0), Ordering::SeqCst);

            tracing::info!(
                path = %path.display(),
                sections = store.sections.len(),
                tasks = store.tasks.len(),
                "Loaded store snapshot"
            );
        }
        Ok(store)
    }

    /// Write a snapshot to the configured path, if any.
    pub fn save_to_file(&self) -> StoreResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let mut sections: Vec<Section> = self.sections.iter().map(|r| r.value().clone()).collect();
        sections.sort_by(|a, b| a.name.cmp(&b.name));
        let mut tasks: Vec<NotificationTask> = self.tasks.iter().map(|r| r.value().clone()).collect();
        tasks.sort_by_key(|t| t.created_on);

        let fanout = self.fanout_requested.load(Ordering::SeqCst);
        let snapshot = Snapshot {
            sections,
            tasks,
            fanout_requested: (fanout > 0).then_some(fanout),
        };

        // The target is only ever replaced whole.
        let tmp = snapshot_tmp_path(path);
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &snapshot)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(
            path = %path.display(),
            sections = snapshot.sections.len(),
            tasks = snapshot.tasks.len(),
            "Saved store snapshot"
        );
        Ok(())
    }

    /// Save a snapshot every `interval` until shutdown.
    pub async fn run_snapshots(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.save_to_file() {
                        tracing::warn!(error = %e, "Periodic snapshot failed");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }
}

#[async_trait]
impl SectionStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Section>> {
        Ok(self.sections.get(name).map(|r| r.value().clone()))
    }

    async fn list(&self) -> StoreResult<Vec<Section>> {
        let mut all: Vec<Section> = self.sections.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn list_projected(&self) -> StoreResult<Vec<Section>> {
        let mut all: Vec<Section> = self
            .sections
            .iter()
            .map(|r| r.value().clone().projected())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert(&self, section: Section) -> StoreResult<Section> {
        match self.sections.entry(section.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::DuplicateName(section.name)),
            dashmap::mapref::entry::Entry::Vacant(slot) => Ok(slot.insert(section).value().clone()),
        }
    }

    async fn replace(&self, section: &Section) -> StoreResult<bool> {
        match self.sections.get_mut(&section.name) {
            Some(mut existing) if existing.id == section.id => {
                // Tokens are only ever set through set_admin_token_if_absent.
                let token = existing.admin_token.take();
                *existing = section.clone();
                if existing.admin_token.is_none() {
                    existing.admin_token = token;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_by_name(&self, name: &str, friendly_name: &str, now: u64) -> StoreResult<Section> {
        let entry = self
            .sections
            .entry(name.to_string())
            .or_insert_with(|| Section::new(name, friendly_name, now));
        Ok(entry.value().clone())
    }

    async fn set_value(
        &self,
        name: &str,
        key: &str,
        value: SettingsValue,
        now: u64,
    ) -> StoreResult<Option<Section>> {
        let Some(mut section) = self.sections.get_mut(name) else {
            return Ok(None);
        };
        section.data.insert(key.to_string(), value);
        section.touch(now);
        Ok(Some(section.value().clone()))
    }

    async fn unset_value(&self, name: &str, key: &str, now: u64) -> StoreResult<Option<bool>> {
        let Some(mut section) = self.sections.get_mut(name) else {
            return Ok(None);
        };
        if section.data.remove(key).is_none() {
            return Ok(Some(false));
        }
        section.touch(now);
        Ok(Some(true))
    }

    async fn fill_values(
        &self,
        name: &str,
        values: BTreeMap<String, SettingsValue>,
        now: u64,
    ) -> StoreResult<Option<Vec<String>>> {
        let Some(mut section) = self.sections.get_mut(name) else {
            return Ok(None);
        };
        let mut written = Vec::new();
        for (key, value) in values {
            if section.data.get(&key).is_some_and(|v| !v.value.is_empty()) {
                continue;
            }
            written.push(key.clone());
            section.data.insert(key, value);
        }
        if !written.is_empty() {
            section.touch(now);
        }
        Ok(Some(written))
    }

    async fn set_admin_token_if_absent(&self, name: &str, token: &str) -> StoreResult<Option<String>> {
        let Some(mut section) = self.sections.get_mut(name) else {
            return Ok(None);
        };
        if section.admin_token.is_none() {
            section.admin_token = Some(token.to_string());
        }
        Ok(section.admin_token.clone())
    }

    async fn delete_by_name(&self, name: &str) -> StoreResult<bool> {
        Ok(self.sections.remove(name).is_some())
    }

    async fn upsert_service(
        &self,
        name: &str,
        friendly_name: &str,
        service: RegisteredService,
        now: u64,
    ) -> StoreResult<Section> {
        let mut section = self
            .sections
            .entry(name.to_string())
            .or_insert_with(|| Section::new(name, friendly_name, now));
        match section.services.iter_mut().find(|s| s.same_subscriber(&service)) {
            Some(existing) => *existing = service,
            None => section.services.push(service),
        }
        Ok(section.value().clone())
    }

    async fn record_client_activity(&self, name: &str, client_id: &str, now: u64) -> StoreResult<bool> {
        let Some(mut section) = self.sections.get_mut(name) else {
            return Ok(false);
        };
        match section.active_clients.iter_mut().find(|c| c.client_id == client_id) {
            Some(client) => client.last_activity = now,
            None => section.active_clients.push(ActiveClient {
                client_id: client_id.to_string(),
                last_activity: now,
            }),
        }
        Ok(true)
    }

    async fn remove_stale_registrations(
        &self,
        name: &str,
        threshold_secs: u64,
        now: u64,
    ) -> StoreResult<Option<(usize, usize)>> {
        let Some(mut entry) = self.sections.get_mut(name) else {
            return Ok(None);
        };
        let section = &mut *entry;

        let stale_clients: HashSet<String> = section
            .active_clients
            .iter()
            .filter(|c| c.is_stale(now, threshold_secs))
            .map(|c| c.client_id.clone())
            .collect();

        let clients_before = section.active_clients.len();
        section.active_clients.retain(|c| !stale_clients.contains(&c.client_id));

        let services_before = section.services.len();
        section.services.retain(|s| {
            let client_gone = !s.subscriber_client_id.is_empty() && stale_clients.contains(&s.subscriber_client_id);
            !s.is_stale(now, threshold_secs) && !client_gone
        });

        Ok(Some((
            services_before - section.services.len(),
            clients_before - section.active_clients.len(),
        )))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: NotificationTask) -> StoreResult<()> {
        self.tasks.insert(task.id, task);
        Ok(())
    }

    async fn pending_urls(&self) -> StoreResult<HashSet<String>> {
        Ok(self
            .tasks
            .iter()
            .filter(|r| r.value().state == TaskState::Pending)
            .map(|r| r.value().url.clone())
            .collect())
    }

    async fn claim_tasks(&self, owner: &str, limit: usize, now: u64) -> StoreResult<Vec<NotificationTask>> {
        let mut candidates: Vec<(u64, Uuid)> = self
            .tasks
            .iter()
            .filter(|r| r.value().is_due(now))
            .map(|r| (r.value().created_on, *r.key()))
            .collect();
        candidates.sort();

        let mut claimed = Vec::new();
        for (_, id) in candidates {
            if claimed.len() >= limit {
                break;
            }
            // Another claimer may have taken it since the scan.
            if let Some(mut task) = self.tasks.get_mut(&id) {
                if !task.is_due(now) {
                    continue;
                }
                task.state = TaskState::InFlight;
                task.claimed_by = Some(owner.to_string());
                task.claimed_at = Some(now);
                claimed.push(task.value().clone());
            }
        }
        Ok(claimed)
    }

    async fn complete_task(&self, id: Uuid, now: u64) -> StoreResult<bool> {
        let Some(mut task) = self.tasks.get_mut(&id) else {
            return Ok(false);
        };
        task.state = TaskState::Completed;
        task.completed_on = Some(now);
        task.last_error = None;
        Ok(true)
    }

    async fn release_task(&self, id: Uuid, not_before: u64, error: &str) -> StoreResult<bool> {
        let Some(mut task) = self.tasks.get_mut(&id) else {
            return Ok(false);
        };
        task.state = TaskState::Pending;
        task.attempts += 1;
        task.not_before = not_before;
        task.claimed_by = None;
        task.claimed_at = None;
        task.last_error = Some(error.to_string());
        Ok(true)
    }

    async fn reclaim_abandoned(&self, claimed_before: u64) -> StoreResult<usize> {
        let mut reclaimed = 0;
        for mut task in self.tasks.iter_mut() {
            let abandoned = task.state == TaskState::InFlight
                && task.claimed_at.is_some_and(|at| at < claimed_before);
            if abandoned {
                task.state = TaskState::Pending;
                task.claimed_by = None;
                task.claimed_at = None;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    async fn purge_completed(&self, completed_before: u64) -> StoreResult<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| {
            !(task.state == TaskState::Completed
                && task.completed_on.is_some_and(|at| at < completed_before))
        });
        Ok(before - self.tasks.len())
    }

    async fn queue_stats(&self) -> StoreResult<QueueStats> {
        let mut stats = QueueStats::default();
        for task in self.tasks.iter() {
            match task.state {
                TaskState::Pending => stats.pending += 1,
                TaskState::InFlight => stats.in_flight += 1,
                TaskState::Completed => stats.completed += 1,
            }
        }
        Ok(stats)
    }

    async fn request_fanout(&self, at: u64) -> StoreResult<()> {
        self.fanout_requested.fetch_max(at.max(1), Ordering::SeqCst);
        Ok(())
    }

    async fn take_fanout_request(&self) -> StoreResult<Option<u64>> {
        let at = self.fanout_requested.swap(0, Ordering::SeqCst);
        Ok((at > 0).then_some(at))
    }
}
