//! Configuration schema — the static, process-wide configuration surface.
//!
//! Hierarchy: `Config` → `EndpointsConfig`, `GlobalConfig`, `NetworkConfig`,
//! `AzureCredentials`, optional `AzureConfig` (the deployment table).
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Loaded once at start-up and shared read-only (`Arc<Config>`) by every request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{EndpointId, Headers, ModelParams};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.keyroute/config.json` + env vars.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    /// Settings applied across every endpoint (`all` in the config file).
    pub all: GlobalConfig,
    pub network: NetworkConfig,
    /// Static Azure credentials, used when no deployment table is configured.
    pub azure_credentials: AzureCredentials,
    /// Azure deployment table. Presence switches Azure endpoints to routed mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureConfig>,
}

// ─────────────────────────────────────────────
// Endpoints
// ─────────────────────────────────────────────

/// Static settings for one endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    /// Default API key for this endpoint.
    pub api_key: String,
    /// Custom base URL (overrides the registry default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Whether users may supply their own key for this endpoint.
    pub user_provides_key: bool,
    /// Token cadence in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
    /// Model used for conversation titles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_model: Option<String>,
    /// Title generation method (`"completion"` / `"functions"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_convo: Option<bool>,
    /// Extra HTTP headers sent with each request.
    pub headers: Headers,
}

impl EndpointConfig {
    /// Whether this endpoint has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All endpoint configurations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointsConfig {
    #[serde(rename = "openAI")]
    pub openai: EndpointConfig,
    #[serde(rename = "azureOpenAI")]
    pub azure_openai: EndpointConfig,
    pub anthropic: EndpointConfig,
    pub google: EndpointConfig,
    pub assistants: EndpointConfig,
    pub azure_assistants: EndpointConfig,
}

impl EndpointsConfig {
    /// Get an endpoint config by identifier.
    pub fn get(&self, id: EndpointId) -> &EndpointConfig {
        match id {
            EndpointId::OpenAi => &self.openai,
            EndpointId::AzureOpenAi => &self.azure_openai,
            EndpointId::Anthropic => &self.anthropic,
            EndpointId::Google => &self.google,
            EndpointId::Assistants => &self.assistants,
            EndpointId::AzureAssistants => &self.azure_assistants,
        }
    }

    pub fn get_mut(&mut self, id: EndpointId) -> &mut EndpointConfig {
        match id {
            EndpointId::OpenAi => &mut self.openai,
            EndpointId::AzureOpenAi => &mut self.azure_openai,
            EndpointId::Anthropic => &mut self.anthropic,
            EndpointId::Google => &mut self.google,
            EndpointId::Assistants => &mut self.assistants,
            EndpointId::AzureAssistants => &mut self.azure_assistants,
        }
    }
}

/// Settings that apply to every endpoint and win over per-endpoint settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
}

/// Outbound network settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// HTTP(S) proxy for all upstream calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// OpenAI organization id (assistants endpoints).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Send the Google key as a header instead of a query parameter.
    pub google_auth_header: bool,
}

// ─────────────────────────────────────────────
// Azure
// ─────────────────────────────────────────────

/// Credentials for one Azure OpenAI deployment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureCredentials {
    pub api_key: String,
    pub instance_name: String,
    pub deployment_name: String,
    pub api_version: String,
}

/// The Azure deployment table: model → group → deployment settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureConfig {
    /// Model name → group membership.
    pub model_group_map: HashMap<String, ModelGroupEntry>,
    /// Group name → deployment settings.
    pub group_map: HashMap<String, AzureGroup>,
    /// Cadence for every Azure deployment, unless a group sets its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
    /// Defaults used when no rate is configured anywhere for the deployment.
    pub stream_rate_policy: StreamRatePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_convo: Option<bool>,
    /// Whether the Azure Assistants endpoint routes through this table.
    pub assistants: bool,
    /// Models usable by Azure Assistants; the first is the default.
    pub assistant_models: Vec<String>,
}

/// A model's membership in a deployment group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelGroupEntry {
    pub group: String,
    /// Deployment name for this model, overriding the group's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    /// API version for this model, overriding the group's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Settings shared by every model of one deployment group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureGroup {
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// URL template; may contain `${INSTANCE_NAME}` and `${DEPLOYMENT_NAME}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Extra headers; may contain `{{USER_ID}}`, `{{USER_EMAIL}}`, `{{USER_NAME}}`.
    pub headers: Headers,
    /// Parameters inserted into every request for this group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_params: Option<ModelParams>,
    /// Parameters removed from every request for this group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_params: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_prompt: Option<bool>,
    /// Serverless deployments authenticate via the `api-key` header.
    pub serverless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
}

/// Default token cadence by model family.
///
/// The first rule whose `contains` appears in the model name wins;
/// otherwise `fallback` applies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamRatePolicy {
    pub rules: Vec<FamilyRate>,
    pub fallback: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRate {
    pub contains: String,
    pub rate: u64,
}

impl Default for StreamRatePolicy {
    fn default() -> Self {
        Self {
            rules: vec![FamilyRate {
                contains: "gpt-4".to_string(),
                rate: 30,
            }],
            fallback: 17,
        }
    }
}

impl StreamRatePolicy {
    /// Default cadence for a model name.
    pub fn rate_for(&self, model: &str) -> u64 {
        self.rules
            .iter()
            .find(|rule| model.contains(&rule.contains))
            .map_or(self.fallback, |rule| rule.rate)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
