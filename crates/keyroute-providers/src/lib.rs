//! Provider layer for Keyroute: from a chat request to a ready client config.
//!
//! # Architecture
//!
//! - [`registry`] — static specs for the six supported endpoints
//! - [`strategy::EndpointStrategy`] — per-endpoint hooks, one impl per [`EndpointId`]
//! - [`resolver::CredentialResolver`] — static / deployment / user-provided credentials
//! - [`azure`] — deployment routing (model → group → connection settings)
//! - [`merge`] — the ordered option layer stack
//! - [`emit`] — the final [`EmittedClientConfig`]
//! - [`throttle`] — token pacing policy and per-stream pacer
//! - [`initializer::ClientInitializer`] — the whole pipeline behind one call
//! - [`http_transport::HttpTransport`] — reqwest client built from an emitted config
//!
//! [`EndpointId`]: keyroute_core::EndpointId

pub mod azure;
pub mod emit;
pub mod http_transport;
pub mod initializer;
pub mod keystore;
pub mod merge;
pub mod registry;
pub mod resolver;
pub mod strategy;
pub mod throttle;
pub mod traits;

// Re-export main types for convenience
pub use azure::{AzureMode, DeploymentRoute};
pub use emit::EmittedClientConfig;
pub use http_transport::{ChatMessage, HttpTransport, TransportError};
pub use initializer::ClientInitializer;
pub use keystore::MemoryKeyStore;
pub use merge::{LayerKind, LayerStack, MergedOptions, OptionLayer};
pub use registry::{EndpointSpec, ENDPOINTS};
pub use resolver::{CredentialResolver, CredentialSource, Credentials, Resolution};
pub use strategy::{strategy_for, EndpointStrategy};
pub use throttle::{StreamRate, TokenPacer};
pub use traits::{StoredUserKey, UserKeyStore, UserKeyValues};
