//! Dynamic configuration service.
//!
//! Stores named sections of scalar settings, keeps them in step across
//! environments with an additive merge, and tells registered services to
//! refresh when their configuration changes.
//!
//! ```text
//!   admin write ──▶ http ──▶ app::ConfigService ──▶ repository ──▶ store
//!                                  │                                 ▲
//!                                  ├──▶ sync (diff / merge / peers) ─┤
//!                                  │                                 │
//!                                  └──▶ notifications ◀── registration
//!                                            │
//!                                            ▼
//!                                  PATCH {listener}/refresh
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod notifications;
pub mod observability;
pub mod registration;
pub mod repository;
pub mod resilience;
pub mod store;
pub mod sync;

pub use app::ConfigService;
pub use config::ServiceConfig;
pub use error::{ConfigError, ConfigResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
