//! Per-endpoint behaviour — one `EndpointStrategy` per `EndpointId`.
//!
//! The resolver and initializer are endpoint-agnostic; everything that differs
//! between providers (where credentials come from, whether a deployment table
//! applies, provider-specific headers) lives behind this trait.

use keyroute_core::config::{AzureConfig, AzureCredentials, Config};
use keyroute_core::types::Headers;
use keyroute_core::{ChatRequest, EndpointId, ResolveError};

use crate::azure::{
    construct_azure_url, AzureMode, DeploymentRoute, API_KEY_HEADER, API_VERSION_QUERY,
};
use crate::merge::{MergedOptions, OptionLayer};
use crate::registry::{
    self, EndpointSpec, AZURE_ASSISTANTS_URL_TEMPLATE, AZURE_CHAT_URL_TEMPLATE,
};
use crate::resolver::Credentials;
use crate::traits::UserKeyValues;

/// Header carrying the Assistants API version.
pub const ASSISTANTS_BETA_HEADER: &str = "OpenAI-Beta";
/// Assistants API version used when the request names none.
pub const DEFAULT_ASSISTANTS_VERSION: &str = "v2";
/// Header carrying the Google key when header auth is enabled.
pub const GOOGLE_API_KEY_HEADER: &str = "x-goog-api-key";

/// Inputs a strategy may consult while building its layers.
#[derive(Clone, Copy, Debug)]
pub struct StrategyContext<'a> {
    pub config: &'a Config,
    pub request: &'a ChatRequest,
}

/// Endpoint-specific resolution hooks. Defaults describe a plain key + URL endpoint.
pub trait EndpointStrategy: Send + Sync {
    fn id(&self) -> EndpointId;

    fn spec(&self) -> &'static EndpointSpec {
        registry::find_by_id(self.id())
    }

    /// Deployment table this endpoint routes through, if one applies.
    fn routing<'a>(&self, _config: &'a Config) -> Option<&'a AzureConfig> {
        None
    }

    /// URL template for routed deployments without a `baseUrl` of their own.
    fn url_template(&self) -> &'static str {
        AZURE_CHAT_URL_TEMPLATE
    }

    /// Model used when neither the call nor the request names one.
    fn default_model(&self, _config: &Config) -> Option<String> {
        self.spec().default_model.map(str::to_string)
    }

    /// Credentials from static configuration.
    fn static_credentials(&self, config: &Config) -> Result<Credentials, ResolveError> {
        let endpoint = config.endpoints.get(self.id());
        Ok(Credentials {
            api_key: endpoint.api_key.clone(),
            base_url: endpoint
                .base_url
                .clone()
                .or_else(|| self.spec().default_base_url.map(str::to_string)),
            azure: None,
        })
    }

    /// Credentials from a key the user stored.
    fn user_credentials(&self, values: &UserKeyValues) -> Result<Credentials, ResolveError> {
        Ok(Credentials {
            api_key: values.api_key.clone(),
            base_url: values.base_url.clone(),
            azure: None,
        })
    }

    /// Endpoint-specific options on top of the per-endpoint config section.
    fn endpoint_layer(&self, _ctx: &StrategyContext<'_>) -> OptionLayer {
        OptionLayer::default()
    }

    /// Options contributed by a deployment route.
    fn deployment_layer(&self, route: &DeploymentRoute, table: &AzureConfig) -> OptionLayer {
        OptionLayer {
            api_key: Some(route.api_key.clone()),
            base_url: Some(route.base_url.clone()),
            headers: route.headers.clone(),
            default_query: route.default_query.clone(),
            drop_params: route.drop_params.clone().unwrap_or_default(),
            add_params: route.add_params.clone().unwrap_or_default(),
            stream_rate: route.stream_rate,
            title_model: table.title_model.clone(),
            title_method: table.title_method.clone(),
            title_convo: table.title_convo,
            force_prompt: route.force_prompt,
            serverless: Some(route.serverless),
            azure: route.azure.clone(),
            ..Default::default()
        }
    }

    /// Last adjustments once every layer is merged.
    fn finalize(
        &self,
        _ctx: &StrategyContext<'_>,
        _merged: &mut MergedOptions,
        _route: Option<&DeploymentRoute>,
    ) {
    }
}

// ─────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────

pub struct OpenAiStrategy;

impl EndpointStrategy for OpenAiStrategy {
    fn id(&self) -> EndpointId {
        EndpointId::OpenAi
    }
}

pub struct AnthropicStrategy;

impl EndpointStrategy for AnthropicStrategy {
    fn id(&self) -> EndpointId {
        EndpointId::Anthropic
    }
}

pub struct GoogleStrategy;

impl EndpointStrategy for GoogleStrategy {
    fn id(&self) -> EndpointId {
        EndpointId::Google
    }

    fn finalize(
        &self,
        ctx: &StrategyContext<'_>,
        merged: &mut MergedOptions,
        _route: Option<&DeploymentRoute>,
    ) {
        if !ctx.config.network.google_auth_header {
            return;
        }
        if let Some(key) = &merged.api_key {
            merged
                .headers
                .insert(GOOGLE_API_KEY_HEADER.to_string(), key.clone());
        }
    }
}

pub struct AssistantsStrategy;

impl EndpointStrategy for AssistantsStrategy {
    fn id(&self) -> EndpointId {
        EndpointId::Assistants
    }

    fn endpoint_layer(&self, ctx: &StrategyContext<'_>) -> OptionLayer {
        assistants_layer(ctx)
    }
}

pub struct AzureOpenAiStrategy;

impl EndpointStrategy for AzureOpenAiStrategy {
    fn id(&self) -> EndpointId {
        EndpointId::AzureOpenAi
    }

    fn routing<'a>(&self, config: &'a Config) -> Option<&'a AzureConfig> {
        config.azure.as_ref()
    }

    fn static_credentials(&self, config: &Config) -> Result<Credentials, ResolveError> {
        azure_credentials(self.id(), &config.azure_credentials, AZURE_CHAT_URL_TEMPLATE)
    }

    fn user_credentials(&self, values: &UserKeyValues) -> Result<Credentials, ResolveError> {
        let creds: AzureCredentials =
            serde_json::from_str(&values.api_key).map_err(|e| ResolveError::InvalidUserKey {
                endpoint: self.id().to_string(),
                reason: e.to_string(),
            })?;
        azure_credentials(self.id(), &creds, AZURE_CHAT_URL_TEMPLATE)
    }

    /// Serverless deployments carry the resolved key in `api-key`; managed
    /// deployments authenticate through [`AzureMode`] and never send the header.
    fn finalize(
        &self,
        _ctx: &StrategyContext<'_>,
        merged: &mut MergedOptions,
        _route: Option<&DeploymentRoute>,
    ) {
        if merged.serverless {
            if let Some(key) = &merged.api_key {
                merged
                    .headers
                    .insert(API_KEY_HEADER.to_string(), key.clone());
            }
        } else if merged.azure.is_some() {
            merged.headers.remove(API_KEY_HEADER);
        }
    }
}

pub struct AzureAssistantsStrategy;

impl EndpointStrategy for AzureAssistantsStrategy {
    fn id(&self) -> EndpointId {
        EndpointId::AzureAssistants
    }

    fn routing<'a>(&self, config: &'a Config) -> Option<&'a AzureConfig> {
        config.azure.as_ref().filter(|table| table.assistants)
    }

    fn url_template(&self) -> &'static str {
        AZURE_ASSISTANTS_URL_TEMPLATE
    }

    fn default_model(&self, config: &Config) -> Option<String> {
        self.routing(config)
            .and_then(|table| table.assistant_models.first().cloned())
    }

    fn endpoint_layer(&self, ctx: &StrategyContext<'_>) -> OptionLayer {
        assistants_layer(ctx)
    }

    /// The key always travels in the `api-key` header, the API version always
    /// as a query parameter, and the deployment name stands in for the model.
    fn finalize(
        &self,
        _ctx: &StrategyContext<'_>,
        merged: &mut MergedOptions,
        route: Option<&DeploymentRoute>,
    ) {
        let Some(route) = route else {
            return;
        };
        if let Some(key) = &merged.api_key {
            merged
                .headers
                .insert(API_KEY_HEADER.to_string(), key.clone());
        }
        if let Some(version) = &route.api_version {
            merged
                .default_query
                .insert(API_VERSION_QUERY.to_string(), version.clone());
        }
        if let Some(deployment) = &route.deployment_name {
            merged.model = Some(deployment.clone());
        }
    }
}

static OPENAI: OpenAiStrategy = OpenAiStrategy;
static AZURE_OPENAI: AzureOpenAiStrategy = AzureOpenAiStrategy;
static ANTHROPIC: AnthropicStrategy = AnthropicStrategy;
static GOOGLE: GoogleStrategy = GoogleStrategy;
static ASSISTANTS: AssistantsStrategy = AssistantsStrategy;
static AZURE_ASSISTANTS: AzureAssistantsStrategy = AzureAssistantsStrategy;

/// The strategy for an endpoint.
pub fn strategy_for(id: EndpointId) -> &'static dyn EndpointStrategy {
    match id {
        EndpointId::OpenAi => &OPENAI,
        EndpointId::AzureOpenAi => &AZURE_OPENAI,
        EndpointId::Anthropic => &ANTHROPIC,
        EndpointId::Google => &GOOGLE,
        EndpointId::Assistants => &ASSISTANTS,
        EndpointId::AzureAssistants => &AZURE_ASSISTANTS,
    }
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn assistants_layer(ctx: &StrategyContext<'_>) -> OptionLayer {
    let version = ctx
        .request
        .assistants_version
        .as_deref()
        .unwrap_or(DEFAULT_ASSISTANTS_VERSION);

    let mut headers = Headers::new();
    headers.insert(
        ASSISTANTS_BETA_HEADER.to_string(),
        format!("assistants={version}"),
    );

    OptionLayer {
        headers,
        organization: ctx.config.network.organization.clone(),
        ..Default::default()
    }
}

fn azure_credentials(
    endpoint: EndpointId,
    creds: &AzureCredentials,
    template: &str,
) -> Result<Credentials, ResolveError> {
    if creds.instance_name.is_empty() || creds.deployment_name.is_empty() {
        return Err(ResolveError::missing_credential(endpoint));
    }
    Ok(Credentials {
        api_key: creds.api_key.clone(),
        base_url: Some(construct_azure_url(
            template,
            &creds.instance_name,
            &creds.deployment_name,
        )),
        azure: Some(AzureMode::from_credentials(creds)),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
