//! Subscriber registrations.
//!
//! # Data Flow
//! ```text
//! PATCH /config/register {component, friendlyName, service}
//!     → ledger.rs upserts the service into the owning section
//!
//! NotificationDispatcher
//!     → ledger.rs list_listeners (distinct callback URLs)
//!
//! sweeper.rs (every sweep_interval_secs)
//!     → ledger.rs sweep_stale (drop idle services and clients)
//! ```
//!
//! # Design Decisions
//! - Registrations live inside their section document, no separate table
//! - Each modified section is persisted once per operation

pub mod ledger;
pub mod sweeper;

pub use ledger::{Listener, RegistrationLedger, SweepReport};
pub use sweeper::StaleSweeper;
