//! Resolution errors.
//!
//! Every variant is terminal for the request: nothing here is retried, and no
//! partially resolved configuration is ever returned alongside an error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// No usable API key (or required base URL) after full resolution.
    #[error("{endpoint} API key not provided. Please reconfigure credentials.")]
    MissingCredential { endpoint: String },

    /// The user's stored key expired; they must enter it again.
    #[error("{endpoint} key expired at {expired_at}. Please provide a new key.")]
    ExpiredCredential {
        endpoint: String,
        expired_at: DateTime<Utc>,
    },

    /// The requested model has no deployment routing entry.
    #[error("model '{0}' is not configured for any deployment group")]
    UnknownModel(String),

    /// The endpoint identifier is not recognized.
    #[error("unknown endpoint '{0}'")]
    UnknownEndpoint(String),

    /// A deployment group is missing fields it needs to be routable.
    #[error("deployment group '{group}' is misconfigured: {reason}")]
    InvalidDeployment { group: String, reason: String },

    /// The stored user key could not be interpreted.
    #[error("stored key for {endpoint} is invalid: {reason}")]
    InvalidUserKey { endpoint: String, reason: String },

    /// The user key store failed to answer.
    #[error("user key lookup failed: {0}")]
    KeyStore(String),

    /// The overall request deadline elapsed during resolution.
    #[error("client initialization timed out after {0:?}")]
    TimedOut(Duration),
}

impl ResolveError {
    /// Stable machine-readable code for surfacing to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::MissingCredential { .. } => "missing_credential",
            ResolveError::ExpiredCredential { .. } => "expired_credential",
            ResolveError::UnknownModel(_) => "unknown_model",
            ResolveError::UnknownEndpoint(_) => "unknown_endpoint",
            ResolveError::InvalidDeployment { .. } => "invalid_deployment",
            ResolveError::InvalidUserKey { .. } => "invalid_user_key",
            ResolveError::KeyStore(_) => "key_store",
            ResolveError::TimedOut(_) => "timed_out",
        }
    }

    pub fn missing_credential(endpoint: impl ToString) -> Self {
        ResolveError::MissingCredential {
            endpoint: endpoint.to_string(),
        }
    }
}
