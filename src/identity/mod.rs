//! Admin token issuance, delegated to the external identity service.

pub mod client;

pub use client::{DisabledIssuer, HttpTokenIssuer, IdentityError, TokenIssuer};
