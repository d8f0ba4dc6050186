//! Credential & endpoint resolution.
//!
//! Picks where the API key and base URL come from: a deployment route, a key
//! the user stored, or the static configuration. Pure apart from the one
//! `UserKeyStore` lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use keyroute_core::config::Config;
use keyroute_core::utils::mask_secret;
use keyroute_core::{ChatRequest, EndpointId, ResolveError};

use crate::azure::{self, AzureMode, DeploymentRoute};
use crate::strategy::strategy_for;
use crate::traits::UserKeyStore;

/// Resolved key material for one request.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: Option<String>,
    pub azure: Option<AzureMode>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("azure", &self.azure)
            .finish()
    }
}

/// Where the credentials came from. Decides which layer they land in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Static,
    Deployment,
    User,
}

/// Outcome of credential resolution.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub credentials: Credentials,
    /// Present when the request went through the deployment table.
    pub route: Option<DeploymentRoute>,
    pub source: CredentialSource,
}

/// Per-request inputs to resolution.
#[derive(Clone, Copy, Debug)]
pub struct ResolveContext<'a> {
    pub request: &'a ChatRequest,
    /// Model after call override, request, and endpoint default are applied.
    pub model: Option<&'a str>,
    /// Reference time for expiry checks.
    pub now: DateTime<Utc>,
}

/// Resolves credentials against shared static config and a user key store.
#[derive(Clone)]
pub struct CredentialResolver {
    config: Arc<Config>,
    key_store: Arc<dyn UserKeyStore>,
}

impl CredentialResolver {
    pub fn new(config: Arc<Config>, key_store: Arc<dyn UserKeyStore>) -> Self {
        Self { config, key_store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve credentials for `endpoint`.
    ///
    /// Order: deployment table (when one applies), then user-provided key (when
    /// the endpoint allows it), then static configuration.
    pub async fn resolve(
        &self,
        endpoint: EndpointId,
        ctx: &ResolveContext<'_>,
    ) -> Result<Resolution, ResolveError> {
        let strategy = strategy_for(endpoint);

        let resolution = if let Some(table) = strategy.routing(&self.config) {
            let model = ctx
                .model
                .ok_or_else(|| ResolveError::UnknownModel(String::new()))?;
            let route = azure::route(model, table, &ctx.request.user, strategy.url_template())?;
            Resolution {
                credentials: Credentials {
                    api_key: route.api_key.clone(),
                    base_url: Some(route.base_url.clone()),
                    azure: route.azure.clone(),
                },
                route: Some(route),
                source: CredentialSource::Deployment,
            }
        } else if self.config.endpoints.get(endpoint).user_provides_key {
            Resolution {
                credentials: self.user_credentials(endpoint, ctx).await?,
                route: None,
                source: CredentialSource::User,
            }
        } else {
            Resolution {
                credentials: strategy.static_credentials(&self.config)?,
                route: None,
                source: CredentialSource::Static,
            }
        };

        if resolution.credentials.api_key.is_empty() {
            warn!(endpoint = %endpoint, source = ?resolution.source, "No API key after resolution");
            return Err(ResolveError::missing_credential(endpoint));
        }

        debug!(
            endpoint = %endpoint,
            source = ?resolution.source,
            api_key = %mask_secret(&resolution.credentials.api_key),
            "Resolved credentials"
        );
        Ok(resolution)
    }

    async fn user_credentials(
        &self,
        endpoint: EndpointId,
        ctx: &ResolveContext<'_>,
    ) -> Result<Credentials, ResolveError> {
        check_expiry(endpoint, ctx.request.key_expires_at, ctx.now)?;

        let stored = self
            .key_store
            .get_user_key(&ctx.request.user.id, endpoint)
            .await?
            .ok_or_else(|| ResolveError::missing_credential(endpoint))?;

        check_expiry(endpoint, stored.expires_at, ctx.now)?;
        strategy_for(endpoint).user_credentials(&stored.values)
    }
}

fn check_expiry(
    endpoint: EndpointId,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ResolveError> {
    match expires_at {
        Some(expired_at) if expired_at <= now => Err(ResolveError::ExpiredCredential {
            endpoint: endpoint.to_string(),
            expired_at,
        }),
        _ => Ok(()),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;
    use crate::traits::{StoredUserKey, UserKeyValues};
    use async_trait::async_trait;
    use chrono::Duration;
    use keyroute_core::config::AzureCredentials;

    fn full_config() -> Config {
        let mut config = Config::default();
        for id in EndpointId::ALL {
            config.endpoints.get_mut(id).api_key = format!("key-{id}");
        }
        config.endpoints.azure_assistants.base_url = Some("https://assist.example.com".into());
        config.azure_credentials = AzureCredentials {
            api_key: "az-key".into(),
            instance_name: "inst".into(),
            deployment_name: "dep".into(),
            api_version: "2024-02-01".into(),
        };
        config
    }

    fn resolver(config: Config, store: MemoryKeyStore) -> CredentialResolver {
        CredentialResolver::new(Arc::new(config), Arc::new(store))
    }

    fn stored(api_key: &str, expires_at: Option<DateTime<Utc>>) -> StoredUserKey {
        StoredUserKey {
            values: UserKeyValues {
                api_key: api_key.into(),
                base_url: None,
            },
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_every_endpoint_resolves_with_static_config() {
        let resolver = resolver(full_config(), MemoryKeyStore::new());
        for id in EndpointId::ALL {
            let request = ChatRequest::new(id.as_str(), "gpt-4o", "u1");
            let ctx = ResolveContext {
                request: &request,
                model: request.model.as_deref(),
                now: Utc::now(),
            };
            let resolution = resolver.resolve(id, &ctx).await.unwrap();
            assert_eq!(resolution.source, CredentialSource::Static);
            assert!(!resolution.credentials.api_key.is_empty(), "{id}");
            assert!(resolution.credentials.base_url.is_some(), "{id}");
        }
    }

    #[tokio::test]
    async fn test_empty_static_key_is_missing_credential() {
        let resolver = resolver(Config::default(), MemoryKeyStore::new());
        let request = ChatRequest::new("openAI", "gpt-4o", "u1");
        let ctx = ResolveContext { request: &request, model: None, now: Utc::now() };
        let err = resolver.resolve(EndpointId::OpenAi, &ctx).await.unwrap_err();
        assert_eq!(err, ResolveError::missing_credential(EndpointId::OpenAi));
    }

    #[tokio::test]
    async fn test_user_key_is_used_when_allowed() {
        let mut config = full_config();
        config.endpoints.openai.user_provides_key = true;
        let store = MemoryKeyStore::new();
        store.insert("u1", EndpointId::OpenAi, stored("sk-user-1234567", None)).await;

        let resolver = resolver(config, store);
        let request = ChatRequest::new("openAI", "gpt-4o", "u1");
        let ctx = ResolveContext { request: &request, model: None, now: Utc::now() };
        let resolution = resolver.resolve(EndpointId::OpenAi, &ctx).await.unwrap();
        assert_eq!(resolution.source, CredentialSource::User);
        assert_eq!(resolution.credentials.api_key, "sk-user-1234567");
    }

    #[tokio::test]
    async fn test_missing_user_key() {
        let mut config = full_config();
        config.endpoints.anthropic.user_provides_key = true;
        let resolver = resolver(config, MemoryKeyStore::new());
        let request = ChatRequest::new("anthropic", "claude", "u1");
        let ctx = ResolveContext { request: &request, model: None, now: Utc::now() };
        let err = resolver.resolve(EndpointId::Anthropic, &ctx).await.unwrap_err();
        assert!(matches!(err, ResolveError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn test_expired_stored_key() {
        let now = Utc::now();
        let mut config = full_config();
        config.endpoints.openai.user_provides_key = true;
        let store = MemoryKeyStore::new();
        store
            .insert("u1", EndpointId::OpenAi, stored("sk-old", Some(now - Duration::hours(1))))
            .await;

        let resolver = resolver(config, store);
        let request = ChatRequest::new("openAI", "gpt-4o", "u1");
        let ctx = ResolveContext { request: &request, model: None, now };
        let err = resolver.resolve(EndpointId::OpenAi, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "expired_credential");
    }

    struct FailingStore;

    #[async_trait]
    impl UserKeyStore for FailingStore {
        async fn get_user_key(
            &self,
            _user_id: &str,
            _endpoint: EndpointId,
        ) -> Result<Option<StoredUserKey>, ResolveError> {
            Err(ResolveError::KeyStore("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_request_expiry_is_checked_before_lookup() {
        let now = Utc::now();
        let mut config = full_config();
        config.endpoints.google.user_provides_key = true;
        let resolver = CredentialResolver::new(Arc::new(config), Arc::new(FailingStore));

        let mut request = ChatRequest::new("google", "gemini-1.5-pro", "u1");
        request.key_expires_at = Some(now - Duration::minutes(5));
        let ctx = ResolveContext { request: &request, model: None, now };
        let err = resolver.resolve(EndpointId::Google, &ctx).await.unwrap_err();
        assert!(matches!(err, ResolveError::ExpiredCredential { .. }));

        request.key_expires_at = Some(now + Duration::minutes(5));
        let ctx = ResolveContext { request: &request, model: None, now };
        let err = resolver.resolve(EndpointId::Google, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "key_store");
    }

    #[tokio::test]
    async fn test_azure_user_key_is_parsed() {
        let mut config = full_config();
        config.endpoints.azure_openai.user_provides_key = true;
        let store = MemoryKeyStore::new();
        let creds = serde_json::json!({
            "apiKey": "user-az-key",
            "instanceName": "mine",
            "deploymentName": "gpt4",
            "apiVersion": "2024-02-01"
        });
        store
            .insert("u1", EndpointId::AzureOpenAi, stored(&creds.to_string(), None))
            .await;

        let resolver = resolver(config, store);
        let request = ChatRequest::new("azureOpenAI", "gpt-4", "u1");
        let ctx = ResolveContext { request: &request, model: None, now: Utc::now() };
        let resolution = resolver.resolve(EndpointId::AzureOpenAi, &ctx).await.unwrap();
        assert_eq!(resolution.credentials.api_key, "user-az-key");
        assert_eq!(
            resolution.credentials.base_url.as_deref(),
            Some("https://mine.openai.azure.com/openai/deployments/gpt4")
        );
    }

    #[tokio::test]
    async fn test_routed_endpoint_needs_a_model() {
        let mut config = full_config();
        config.azure = Some(Default::default());
        let resolver = resolver(config, MemoryKeyStore::new());
        let request = ChatRequest::new("azureOpenAI", "gpt-4o", "u1");

        let ctx = ResolveContext { request: &request, model: None, now: Utc::now() };
        let err = resolver.resolve(EndpointId::AzureOpenAi, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "unknown_model");

        let ctx = ResolveContext { request: &request, model: Some("gpt-4o"), now: Utc::now() };
        let err = resolver.resolve(EndpointId::AzureOpenAi, &ctx).await.unwrap_err();
        assert_eq!(err, ResolveError::UnknownModel("gpt-4o".into()));
    }
}
