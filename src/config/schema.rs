//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the dynamic-config service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity of this environment and its shared secret.
    pub environment: EnvironmentConfig,

    /// Snapshot persistence.
    pub store: StoreConfig,

    /// Identity service used to mint admin tokens.
    pub identity: IdentityConfig,

    /// Notification queue settings.
    pub notifications: NotificationConfig,

    /// Role of this instance.
    pub node: NodeConfig,

    /// Subscriber registration housekeeping.
    pub registration: RegistrationConfig,

    /// Peer environment client settings.
    pub peers: PeerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 4 * 1024 * 1024,
        }
    }
}

/// This environment, as seen by its peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment name, used as the local column in diffs.
    pub name: String,

    /// Deployment identifier stamped on values exported from here.
    pub deployment_id: String,

    /// Secret shared by every environment for diff/import.
    pub shared_secret: String,

    /// Peer base URLs offered to operators.
    pub peers: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            deployment_id: "0".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            shared_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            peers: Vec::new(),
        }
    }
}

/// Snapshot persistence for the in-process store.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file; `None` keeps everything in memory only.
    pub snapshot_path: Option<String>,

    /// Seconds between periodic snapshots (0 = only on shutdown).
    pub snapshot_interval_secs: u64,
}

/// Identity service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Mint tokens through the identity service. When false, token
    /// generation reports the service as unavailable.
    pub enabled: bool,

    /// Identity service base URL.
    pub base_url: String,

    /// Key proving this service may mint tokens.
    pub origin_key: String,

    /// Contact address recorded on minted tokens.
    pub email: String,

    /// Token lifetime in days.
    pub token_days: u32,

    /// Discriminator assigned to section identities.
    pub discriminator: u32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8081".to_string(),
            origin_key: String::new(),
            email: "platform@example.com".to_string(),
            token_days: 5_000,
            discriminator: 10_000,
            timeout_secs: 10,
        }
    }
}

/// Notification queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Run the dispatcher loop.
    pub enabled: bool,

    /// Tick interval in milliseconds.
    pub interval_ms: u64,

    /// Tasks a primary instance executes per tick.
    pub primary_capacity: usize,

    /// Tasks a secondary instance executes per tick.
    pub secondary_capacity: usize,

    /// Subscriber refresh timeout in seconds.
    pub request_timeout_secs: u64,

    /// Base delay before a failed delivery is retried, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum retry delay in milliseconds.
    pub retry_max_delay_ms: u64,

    /// In-flight tasks older than this are assumed abandoned by a dead
    /// instance and returned to the queue.
    pub abandoned_after_secs: u64,

    /// Completed tasks are kept this long for inspection.
    pub completed_retention_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            primary_capacity: 50,
            secondary_capacity: 50,
            request_timeout_secs: 10,
            retry_base_delay_ms: 5_000,
            retry_max_delay_ms: 300_000,
            abandoned_after_secs: 120,
            completed_retention_secs: 3_600,
        }
    }
}

/// Instance identity and role.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Stable instance identifier; generated when empty.
    pub instance_id: String,

    /// Whether this instance starts as the primary enqueuer.
    pub primary: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            instance_id: String::new(),
            primary: true,
        }
    }
}

/// Registration housekeeping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Run the stale sweep.
    pub sweep_enabled: bool,

    /// Seconds between sweeps.
    pub sweep_interval_secs: u64,

    /// Registrations idle longer than this are removed.
    pub stale_threshold_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: true,
            sweep_interval_secs: 3_600,
            stale_threshold_secs: 259_200, // 3 days
        }
    }
}

/// Peer environment client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Timeout for diff and import calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
