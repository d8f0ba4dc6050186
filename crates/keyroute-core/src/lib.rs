//! Keyroute core — shared types, errors, configuration, and utilities.
//!
//! - [`types`] — endpoint identifiers and the inbound request shape
//! - [`error`] — the resolution error kinds surfaced to callers
//! - [`config`] — static configuration schema, loading, env overrides
//! - [`utils`] — paths, secret masking, placeholder substitution

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::ResolveError;
pub use types::{CallOverride, ChatRequest, EndpointId, RequestOverrides, UserContext};
