//! Cross-environment reconciliation.
//!
//! # Data Flow
//! ```text
//! PATCH /config/diff {environments: [peer urls]}
//!     → peer.rs fetches each peer's sections (concurrently, with timeout)
//!     → diff.rs compares local + reachable peers
//!     → unreachable peers become warnings
//!
//! POST /config/export {envUrl}
//!     → peer.rs pushes local sections to {envUrl}/config/import
//!
//! POST /config/import
//!     → merge.rs fills local gaps, local values always win
//! ```
//!
//! # Design Decisions
//! - No consensus: reconciliation is operator-triggered and best-effort
//! - Merge is additive so it is safe to repeat and to run both ways

pub mod diff;
pub mod merge;
pub mod peer;

pub use diff::{DiffEngine, DiffReport, DiffResult, EnvironmentValue};
pub use merge::{import_marker, parse_sections, MergeEngine, MergeOutcome};
pub use peer::{PeerClient, PeerError};
