//! Per-section key/value access.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{now_unix, ScalarValue, Section, SettingsValue};
use crate::observability::metrics;
use crate::store::SectionStore;

/// Reads and writes the `data` map of a section.
#[derive(Clone)]
pub struct ValueStore {
    store: Arc<dyn SectionStore>,
}

impl ValueStore {
    pub fn new(store: Arc<dyn SectionStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, section: &str, key: &str) -> ConfigResult<Option<SettingsValue>> {
        let section = self.load(section).await?;
        Ok(section.data.get(key).cloned())
    }

    pub async fn list(&self, section: &str) -> ConfigResult<BTreeMap<String, SettingsValue>> {
        Ok(self.load(section).await?.data)
    }

    /// Write one value. Structured values are rejected before the store is
    /// touched.
    pub async fn set(&self, section: &str, key: &str, value: Value, comment: &str) -> ConfigResult<Section> {
        if key.trim().is_empty() {
            return Err(ConfigError::InvalidRequest("key must not be blank".into()));
        }
        let value = ScalarValue::from_json(key, value)?;

        let now = now_unix();
        let updated = self
            .store
            .set_value(section, key, SettingsValue::new(value, comment, now), now)
            .await?
            .ok_or_else(|| ConfigError::section_missing(section))?;

        metrics::record_value_written(section);
        tracing::info!(section = %section, key = %key, "Value updated");
        Ok(updated)
    }

    /// Remove one value. `Ok(false)` if the key did not exist.
    pub async fn remove(&self, section: &str, key: &str) -> ConfigResult<bool> {
        let removed = self
            .store
            .unset_value(section, key, now_unix())
            .await?
            .ok_or_else(|| ConfigError::section_missing(section))?;
        if removed {
            tracing::info!(section = %section, key = %key, "Value removed");
        }
        Ok(removed)
    }

    async fn load(&self, section: &str) -> ConfigResult<Section> {
        self.store
            .find_by_name(section)
            .await?
            .ok_or_else(|| ConfigError::section_missing(section))
    }
}
