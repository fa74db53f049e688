//! Instance roles.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    /// Only the primary turns fan-out requests into tasks.
    pub fn can_enqueue(self) -> bool {
        matches!(self, Role::Primary)
    }
}

/// Source of this instance's role. Election lives outside this crate.
pub trait Coordinator: Send + Sync {
    fn role(&self) -> Role;
    fn instance_id(&self) -> &str;
}

/// Role fixed by configuration, switchable at runtime.
#[derive(Debug)]
pub struct StaticCoordinator {
    instance_id: String,
    primary: AtomicBool,
}

impl StaticCoordinator {
    pub fn new(instance_id: impl Into<String>, primary: bool) -> Self {
        Self {
            instance_id: instance_id.into(),
            primary: AtomicBool::new(primary),
        }
    }

    pub fn set_primary(&self, primary: bool) {
        let was = self.primary.swap(primary, Ordering::SeqCst);
        if was != primary {
            tracing::info!(instance = %self.instance_id, primary, "Instance role changed");
        }
    }
}

impl Coordinator for StaticCoordinator {
    fn role(&self) -> Role {
        if self.primary.load(Ordering::SeqCst) {
            Role::Primary
        } else {
            Role::Secondary
        }
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}
