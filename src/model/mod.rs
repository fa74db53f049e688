//! Persisted document shapes.
//!
//! ```text
//! Section (root, unique name)
//!     ├── data: key → SettingsValue(scalar, comment, modifiedAt)
//!     ├── services: [RegisteredService]
//!     └── activeClients: [ActiveClient]
//!
//! NotificationTask (queue document, keyed by id)
//! ```

pub mod section;
pub mod service;
pub mod task;
pub mod value;

pub use section::Section;
pub use service::{ActiveClient, RegisteredService};
pub use task::{NotificationTask, QueueStats, TaskState};
pub use value::{ScalarValue, SettingsValue};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
