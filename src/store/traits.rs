//! Storage trait definitions.
//!
//! The document store serializes updates per document; none of these
//! operations span more than one document.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::StoreResult;
use crate::model::{NotificationTask, QueueStats, RegisteredService, Section, SettingsValue};

/// Section documents, unique by name.
#[async_trait]
pub trait SectionStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Section>>;

    /// Full documents, including subscribers.
    async fn list(&self) -> StoreResult<Vec<Section>>;

    /// Documents without `services` and `active_clients`.
    async fn list_projected(&self) -> StoreResult<Vec<Section>>;

    /// Insert a new document; fails with `DuplicateName` if the name is taken.
    async fn insert(&self, section: Section) -> StoreResult<Section>;

    /// Replace the document with the same id. Returns false if it is gone.
    /// A persisted admin token survives a replace that carries none.
    async fn replace(&self, section: &Section) -> StoreResult<bool>;

    /// Insert `Section::new(name, friendly_name)` unless the name exists.
    /// An existing document is returned untouched.
    async fn upsert_by_name(&self, name: &str, friendly_name: &str, now: u64) -> StoreResult<Section>;

    /// Set one key. `None` if the section does not exist.
    async fn set_value(
        &self,
        name: &str,
        key: &str,
        value: SettingsValue,
        now: u64,
    ) -> StoreResult<Option<Section>>;

    /// Unset one key. `None` if the section does not exist, `Some(false)` if
    /// the key was absent (document untouched).
    async fn unset_value(&self, name: &str, key: &str, now: u64) -> StoreResult<Option<bool>>;

    /// Insert each of `values` whose key is missing or empty locally.
    /// Returns the keys written, or `None` if the section does not exist.
    async fn fill_values(
        &self,
        name: &str,
        values: BTreeMap<String, SettingsValue>,
        now: u64,
    ) -> StoreResult<Option<Vec<String>>>;

    /// Set the admin token only if it is still null. Returns the token that
    /// is persisted afterwards, or `None` if the section does not exist.
    async fn set_admin_token_if_absent(&self, name: &str, token: &str) -> StoreResult<Option<String>>;

    async fn delete_by_name(&self, name: &str) -> StoreResult<bool>;

    /// Create the section if needed, then replace the entry for the same
    /// subscriber or append `service`.
    async fn upsert_service(
        &self,
        name: &str,
        friendly_name: &str,
        service: RegisteredService,
        now: u64,
    ) -> StoreResult<Section>;

    /// Stamp `client_id` as active. False if the section does not exist.
    async fn record_client_activity(&self, name: &str, client_id: &str, now: u64) -> StoreResult<bool>;

    /// Drop active clients idle longer than `threshold_secs` as of `now`,
    /// services idle as long, and services whose client went stale, in one
    /// document update. Returns `(services_removed, clients_removed)`, or
    /// `None` if the section does not exist.
    async fn remove_stale_registrations(
        &self,
        name: &str,
        threshold_secs: u64,
        now: u64,
    ) -> StoreResult<Option<(usize, usize)>>;
}

/// Durable notification queue.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NotificationTask) -> StoreResult<()>;

    /// URLs that already have a pending task.
    async fn pending_urls(&self) -> StoreResult<HashSet<String>>;

    /// Atomically move up to `limit` due pending tasks to in-flight,
    /// oldest first, stamping `owner`.
    async fn claim_tasks(&self, owner: &str, limit: usize, now: u64) -> StoreResult<Vec<NotificationTask>>;

    async fn complete_task(&self, id: Uuid, now: u64) -> StoreResult<bool>;

    /// Back to pending with `attempts + 1`, not claimable before `not_before`.
    async fn release_task(&self, id: Uuid, not_before: u64, error: &str) -> StoreResult<bool>;

    /// Return in-flight tasks claimed before `claimed_before` to pending.
    async fn reclaim_abandoned(&self, claimed_before: u64) -> StoreResult<usize>;

    /// Drop completed tasks finished before `completed_before`.
    async fn purge_completed(&self, completed_before: u64) -> StoreResult<usize>;

    async fn queue_stats(&self) -> StoreResult<QueueStats>;

    /// Record that a fan-out is wanted. Repeated requests coalesce.
    async fn request_fanout(&self, at: u64) -> StoreResult<()>;

    /// Consume the pending fan-out request, if any.
    async fn take_fanout_request(&self) -> StoreResult<Option<u64>>;
}
