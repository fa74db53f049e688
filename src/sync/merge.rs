//! Additive merge of sections received from another environment.
//!
//! Local values always win; incoming values only fill gaps. Running the
//! same merge twice, or in both directions, loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{now_unix, Section, SettingsValue};
use crate::observability::metrics;
use crate::repository::SectionRepository;

/// Aggregate result of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub sections_affected: usize,
    pub values_added: usize,
}

/// Comment prefix recording where a value came from.
pub fn import_marker(deployment_id: &str) -> String {
    format!("[Imported from {}]", deployment_id)
}

fn tag_comment(value: &mut SettingsValue, marker: &str) {
    value.comment = if value.comment.is_empty() {
        marker.to_string()
    } else {
        format!("{} {}", marker, value.comment)
    };
}

/// Decode raw section documents, dropping the malformed ones.
pub fn parse_sections(raw: Vec<Value>) -> Vec<Section> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<Section>(value) {
            Ok(section) if !section.name.trim().is_empty() => Some(section),
            Ok(_) => {
                tracing::warn!("Skipping incoming section without a name");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed incoming section");
                None
            }
        })
        .collect()
}

/// Applies foreign sections to the local repository.
pub struct MergeEngine {
    repository: Arc<SectionRepository>,
}

impl MergeEngine {
    pub fn new(repository: Arc<SectionRepository>) -> Self {
        Self { repository }
    }

    pub async fn merge(&self, incoming: Vec<Section>, deployment_id: &str) -> ConfigResult<MergeOutcome> {
        let marker = import_marker(deployment_id);
        let mut outcome = MergeOutcome::default();

        for section in incoming {
            if section.name.trim().is_empty() {
                tracing::warn!("Skipping incoming section without a name");
                continue;
            }

            // A new section counts as affected even when it carries no keys.
            let added = if self.repository.exists(&section.name).await? {
                Some(self.fill_gaps(section, &marker).await?).filter(|n| *n > 0)
            } else {
                self.import_new(section, &marker).await?
            };
            if let Some(added) = added {
                outcome.sections_affected += 1;
                outcome.values_added += added;
            }
        }

        metrics::record_merge(outcome.values_added);
        tracing::info!(
            deployment = %deployment_id,
            sections_affected = outcome.sections_affected,
            values_added = outcome.values_added,
            "Merge complete"
        );
        Ok(outcome)
    }

    /// Insert a section this environment has never seen. `None` if another
    /// writer created it in the meantime.
    async fn import_new(&self, mut section: Section, marker: &str) -> ConfigResult<Option<usize>> {
        let now = now_unix();
        let name = section.name.clone();
        let mut fresh = Section::new(section.name, section.friendly_name, now);
        for value in section.data.values_mut() {
            tag_comment(value, marker);
        }
        fresh.data = section.data;
        let added = fresh.data.len();

        match self.repository.insert(fresh).await {
            Ok(_) => {
                tracing::info!(section = %name, values = added, "Imported new section");
                Ok(Some(added))
            }
            Err(ConfigError::DuplicateName(_)) => {
                tracing::warn!(section = %name, "Section appeared during merge; skipped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Adopt incoming keys the local section lacks or holds empty, in one
    /// document update.
    async fn fill_gaps(&self, incoming: Section, marker: &str) -> ConfigResult<usize> {
        let now = now_unix();
        let mut values = incoming.data;
        for value in values.values_mut() {
            tag_comment(value, marker);
            value.modified_at = now;
        }

        let written = self.repository.fill_values(&incoming.name, values, now).await?;
        if !written.is_empty() {
            tracing::debug!(section = %incoming.name, keys = ?written, "Filled missing values");
        }
        Ok(written.len())
    }
}
