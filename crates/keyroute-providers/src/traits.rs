//! Seams to external collaborators.
//!
//! The only suspension point in resolution is the user key lookup, so the store
//! is the one async trait here. Implementations must be cancel-safe: dropping the
//! future aborts the lookup and nothing is left half-written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyroute_core::{EndpointId, ResolveError};

/// Key material a user saved for one endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKeyValues {
    /// The key itself. For Azure OpenAI this is a JSON-encoded credential set.
    pub api_key: String,
    /// Base URL the user wants to use instead of the configured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// A stored user key with its expiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUserKey {
    pub values: UserKeyValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Lookup of user-supplied keys.
#[async_trait]
pub trait UserKeyStore: Send + Sync {
    /// Fetch the key `user_id` stored for `endpoint`, if any.
    ///
    /// Returns `Ok(None)` when the user never stored a key; errors are reserved
    /// for the store itself failing.
    async fn get_user_key(
        &self,
        user_id: &str,
        endpoint: EndpointId,
    ) -> Result<Option<StoredUserKey>, ResolveError>;
}
