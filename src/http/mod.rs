//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace span, timeout, body limit)
//!     → auth.rs (admin key / section token / shared secret)
//!     → handlers.rs (decode body, call ConfigService)
//!     → response.rs (ConfigError → status + JSON body)
//! ```

pub mod auth;
pub mod handlers;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer, X_REQUEST_ID};
