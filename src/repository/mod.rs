//! Section catalog and value access.
//!
//! # Data Flow
//! ```text
//! startup
//!     → SectionRepository::new (ensure_exists for each well-known section)
//!
//! admin write
//!     → ValueStore::set (scalar check at the boundary)
//!     → SectionStore::set_value (one document update)
//!
//! first token request
//!     → TokenIssuer::mint → set_admin_token_if_absent
//! ```

pub mod sections;
pub mod values;

pub use sections::{is_well_known, SectionRepository, WELL_KNOWN_SECTIONS};
pub use values::ValueStore;
