//! The section document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::model::service::{ActiveClient, RegisteredService};
use crate::model::value::SettingsValue;

/// A named configuration scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub name: String,

    #[serde(default)]
    pub friendly_name: String,

    #[serde(default)]
    pub data: BTreeMap<String, SettingsValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<RegisteredService>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_clients: Vec<ActiveClient>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,

    /// Unix seconds of the last mutation.
    #[serde(default)]
    pub updated_on: u64,
}

impl Section {
    pub fn new(name: impl Into<String>, friendly_name: impl Into<String>, now: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            friendly_name: friendly_name.into(),
            data: BTreeMap::new(),
            services: Vec::new(),
            active_clients: Vec::new(),
            admin_token: None,
            updated_on: now,
        }
    }

    /// Listing projection: subscriber lists can be large and are only
    /// returned when a section is fetched individually.
    pub fn projected(mut self) -> Self {
        self.services = Vec::new();
        self.active_clients = Vec::new();
        self
    }

    /// Shape sent to another environment: no local identity-bound state.
    pub fn prepared_for_export(&self) -> Self {
        let mut section = self.clone().projected();
        section.admin_token = None;
        section
    }

    pub fn touch(&mut self, now: u64) {
        self.updated_on = now;
    }
}
