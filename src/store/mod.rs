//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! SectionRepository / ValueStore / RegistrationLedger
//!     → SectionStore (document per section, unique name)
//!
//! NotificationDispatcher
//!     → TaskStore (document per task + fan-out marker)
//!
//! MemoryStore implements both, with a JSON snapshot on disk
//! ```

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{SectionStore, TaskStore};

use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("section '{0}' already exists")]
    DuplicateName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
