//! Cross-environment difference.
//!
//! # Algorithm
//! ```text
//! environments: id → [Section]
//!     → every distinct (section, key) pair
//!     → keep keys containing the filter (case-sensitive)
//!     → per environment: Present(value) | Absent
//!     → emit only pairs where environments disagree
//! ```
//!
//! Output is sorted by section name, then key.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ScalarValue, Section};
use crate::observability::metrics;
use crate::sync::peer::PeerClient;

/// What one environment holds for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum EnvironmentValue {
    Present(ScalarValue),
    Absent,
}

/// One key on which environments disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub key: String,
    pub section_name: String,
    pub values_by_environment: BTreeMap<String, EnvironmentValue>,
}

/// Diff output plus the environments that could not be compared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub diff: Vec<DiffResult>,
    pub warnings: Vec<String>,
}

/// Compare snapshots of the same sections across environments.
pub struct DiffEngine {
    peers: PeerClient,
    local_environment: String,
}

impl DiffEngine {
    pub fn new(peers: PeerClient, local_environment: impl Into<String>) -> Self {
        Self {
            peers,
            local_environment: local_environment.into(),
        }
    }

    /// Pure comparison of already-fetched snapshots.
    pub fn compute(environments: &BTreeMap<String, Vec<Section>>, filter: Option<&str>) -> DiffReport {
        let filter = filter.filter(|f| !f.is_empty());

        // First occurrence of a section name wins within one environment.
        let mut indexed: BTreeMap<&str, BTreeMap<&str, &Section>> = BTreeMap::new();
        for (env, sections) in environments {
            let index = indexed.entry(env.as_str()).or_default();
            for section in sections {
                index.entry(section.name.as_str()).or_insert(section);
            }
        }

        let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
        for index in indexed.values() {
            for section in index.values() {
                for key in section.data.keys() {
                    if filter.map_or(true, |f| key.contains(f)) {
                        pairs.insert((section.name.as_str(), key.as_str()));
                    }
                }
            }
        }

        let mut diff = Vec::new();
        for (section_name, key) in pairs {
            let values: BTreeMap<String, EnvironmentValue> = indexed
                .iter()
                .map(|(env, index)| {
                    let value = index
                        .get(section_name)
                        .and_then(|s| s.data.get(key))
                        .map(|v| EnvironmentValue::Present(v.value.clone()))
                        .unwrap_or(EnvironmentValue::Absent);
                    (env.to_string(), value)
                })
                .collect();

            let mut iter = values.values();
            let agree = match iter.next() {
                Some(first) => iter.all(|v| v == first),
                None => true,
            };
            if !agree {
                diff.push(DiffResult {
                    key: key.to_string(),
                    section_name: section_name.to_string(),
                    values_by_environment: values,
                });
            }
        }

        DiffReport {
            diff,
            warnings: Vec::new(),
        }
    }

    /// Fetch every peer concurrently and diff them against `local`.
    ///
    /// A peer that fails is excluded and reported as a warning.
    pub async fn diff_with_peers(&self, local: Vec<Section>, peer_urls: &[String], filter: Option<&str>) -> DiffReport {
        let fetches = peer_urls.iter().map(|url| async move {
            (url.clone(), self.peers.fetch_sections(url).await)
        });
        let results = join_all(fetches).await;

        let mut environments = BTreeMap::new();
        environments.insert(self.local_environment.clone(), local);

        let mut warnings = Vec::new();
        for (url, result) in results {
            match result {
                Ok(sections) => {
                    tracing::debug!(peer = %url, sections = sections.len(), "Fetched peer sections");
                    environments.insert(url, sections);
                }
                Err(e) => {
                    tracing::warn!(peer = %url, error = %e, "Peer excluded from diff");
                    metrics::record_diff_warning();
                    warnings.push(format!("{}: {}", url, e));
                }
            }
        }

        let mut report = Self::compute(&environments, filter);
        report.warnings = warnings;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SettingsValue;

    fn section(name: &str, values: &[(&str, &str)]) -> Section {
        let mut section = Section::new(name, name, 0);
        for (k, v) in values {
            section.data.insert(k.to_string(), SettingsValue::new(*v, "", 0));
        }
        section
    }

    fn envs(list: Vec<(&str, Vec<Section>)>) -> BTreeMap<String, Vec<Section>> {
        list.into_iter().map(|(id, s)| (id.to_string(), s)).collect()
    }

    #[test]
    fn test_self_diff_is_empty() {
        let snapshot = vec![section("billing", &[("rate", "5")]), section("global", &[("motd", "hi")])];
        let report = DiffEngine::compute(&envs(vec![("a", snapshot.clone()), ("b", snapshot)]), None);
        assert!(report.diff.is_empty());
    }

    #[test]
    fn test_agreement_suppressed_disagreement_reported() {
        let environments = envs(vec![
            ("a", vec![section("billing", &[("rate", "5"), ("cap", "1")])]),
            ("b", vec![section("billing", &[("rate", "5"), ("cap", "1")])]),
            ("c", vec![section("billing", &[("rate", "5"), ("cap", "2")])]),
        ]);
        let report = DiffEngine::compute(&environments, None);

        assert_eq!(report.diff.len(), 1);
        let result = &report.diff[0];
        assert_eq!(result.key, "cap");
        assert_eq!(result.section_name, "billing");
        assert_eq!(result.values_by_environment.len(), 3);
        assert_eq!(result.values_by_environment["c"], EnvironmentValue::Present("2".into()));
    }

    #[test]
    fn test_absent_counts_as_distinct() {
        let environments = envs(vec![
            ("a", vec![section("billing", &[("rate", "5")])]),
            ("b", vec![section("billing", &[])]),
            ("c", vec![]),
        ]);
        let report = DiffEngine::compute(&environments, None);

        assert_eq!(report.diff.len(), 1);
        let values = &report.diff[0].values_by_environment;
        assert_eq!(values["b"], EnvironmentValue::Absent);
        assert_eq!(values["c"], EnvironmentValue::Absent);
    }

    #[test]
    fn test_filter_and_ordering() {
        let environments = envs(vec![
            ("a", vec![
                section("zeta", &[("billing_rate", "1"), ("other", "1")]),
                section("alpha", &[("billing_cap", "1"), ("billing_rate", "1")]),
            ]),
            ("b", vec![]),
        ]);
        let report = DiffEngine::compute(&environments, Some("billing"));

        let pairs: Vec<(&str, &str)> = report
            .diff
            .iter()
            .map(|d| (d.section_name.as_str(), d.key.as_str()))
            .collect();
        assert_eq!(pairs, vec![("alpha", "billing_cap"), ("alpha", "billing_rate"), ("zeta", "billing_rate")]);
        assert!(report.diff.iter().all(|d| d.key.contains("billing")));

        let case_sensitive = DiffEngine::compute(&environments, Some("BILLING"));
        assert!(case_sensitive.diff.is_empty());
    }

    #[test]
    fn test_single_environment_has_no_diff() {
        let report = DiffEngine::compute(&envs(vec![("a", vec![section("billing", &[("rate", "5")])])]), None);
        assert!(report.diff.is_empty());
    }

    #[test]
    fn test_environment_value_json() {
        let present = serde_json::to_value(EnvironmentValue::Present("5".into())).unwrap();
        assert_eq!(present, serde_json::json!({"state": "present", "value": "5"}));
        let absent = serde_json::to_value(EnvironmentValue::Absent).unwrap();
        assert_eq!(absent, serde_json::json!({"state": "absent"}));
    }

    #[tokio::test]
    async fn test_unreachable_peer_becomes_warning() {
        let peers = PeerClient::new("s", std::time::Duration::from_millis(500)).unwrap();
        let engine = DiffEngine::new(peers, "local");
        let report = engine
            .diff_with_peers(vec![section("billing", &[("rate", "5")])], &["http://127.0.0.1:1".into()], None)
            .await;

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("http://127.0.0.1:1"));
        assert!(report.diff.is_empty());
    }
}
