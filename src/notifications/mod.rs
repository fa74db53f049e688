//! Change notification fan-out.
//!
//! # Data Flow
//! ```text
//! value written / merge adds values (any instance)
//!     → TaskStore::request_fanout (durable, coalescing marker)
//!
//! dispatcher tick (every instance, every interval_ms)
//!     primary only:
//!         → take marker → one task per distinct listener URL
//!         → purge old completed tasks
//!     all instances:
//!         → reclaim tasks abandoned in flight
//!         → claim up to capacity due tasks
//!         → PATCH {url}/refresh with the section admin token
//!         → success: completed | failure: pending again after backoff
//! ```
//!
//! # Design Decisions
//! - At-least-once delivery: there is no terminal failure state
//! - Claims are atomic in the store, so instances never share a task
//! - A URL with a pending task is not enqueued again

pub mod dispatcher;
pub mod role;

pub use dispatcher::{NotificationDispatcher, TickReport};
pub use role::{Coordinator, Role, StaticCoordinator};
