//! Core types for Keyroute — the endpoint identifier and the inbound request shape.
//!
//! A request names an endpoint as a free-form string (the chat UI sends `"openAI"`,
//! `"azureOpenAI"`, ...). Parsing it into [`EndpointId`] is the first resolution step;
//! everything downstream dispatches on the typed tag.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Model parameters sent to the provider (`temperature`, `max_tokens`, ...).
pub type ModelParams = serde_json::Map<String, serde_json::Value>;

/// HTTP header map. Ordered so emitted configs print and compare deterministically.
pub type Headers = BTreeMap<String, String>;

// ─────────────────────────────────────────────
// EndpointId
// ─────────────────────────────────────────────

/// A logical provider target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EndpointId {
    #[serde(rename = "openAI")]
    OpenAi,
    #[serde(rename = "azureOpenAI")]
    AzureOpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "assistants")]
    Assistants,
    #[serde(rename = "azureAssistants")]
    AzureAssistants,
}

impl EndpointId {
    /// Every supported endpoint, in display order.
    pub const ALL: [EndpointId; 6] = [
        EndpointId::OpenAi,
        EndpointId::AzureOpenAi,
        EndpointId::Anthropic,
        EndpointId::Google,
        EndpointId::Assistants,
        EndpointId::AzureAssistants,
    ];

    /// Canonical wire name (e.g. `"azureOpenAI"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointId::OpenAi => "openAI",
            EndpointId::AzureOpenAi => "azureOpenAI",
            EndpointId::Anthropic => "anthropic",
            EndpointId::Google => "google",
            EndpointId::Assistants => "assistants",
            EndpointId::AzureAssistants => "azureAssistants",
        }
    }

    /// Whether this is the cloud-hosted (Azure) variant of an OpenAI endpoint.
    pub fn is_azure(&self) -> bool {
        matches!(self, EndpointId::AzureOpenAi | EndpointId::AzureAssistants)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointId {
    type Err = ResolveError;

    /// Accepts the canonical names plus the common aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "openai" => Ok(EndpointId::OpenAi),
            "azureopenai" | "azure" | "managedopenai" => Ok(EndpointId::AzureOpenAi),
            "anthropic" => Ok(EndpointId::Anthropic),
            "google" => Ok(EndpointId::Google),
            "assistants" => Ok(EndpointId::Assistants),
            "azureassistants" | "managedassistants" => Ok(EndpointId::AzureAssistants),
            _ => Err(ResolveError::UnknownEndpoint(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────
// Inbound request
// ─────────────────────────────────────────────

/// The authenticated user a request is made on behalf of.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContext {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Request-scoped option overrides supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOverrides {
    /// Extra headers for this request only.
    pub headers: Headers,
    /// Stream cadence in milliseconds for this request only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
    /// Title-generation model for this request only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_model: Option<String>,
}

/// An inbound chat request. Consumed by the initializer, never mutated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    /// Endpoint name as sent by the client (parsed into [`EndpointId`]).
    pub endpoint: String,
    /// Requested model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Model parameters chosen by the user.
    pub model_parameters: ModelParams,
    /// Expiry of the user's stored key, when the client already knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_expires_at: Option<DateTime<Utc>>,
    /// Assistants API version (`"v1"` / `"v2"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistants_version: Option<String>,
    pub user: UserContext,
    pub overrides: RequestOverrides,
}

impl ChatRequest {
    /// Minimal request for an endpoint + model on behalf of a user.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: Some(model.into()),
            user: UserContext::new(user_id),
            ..Default::default()
        }
    }
}

/// Explicit endpoint/model chosen by the calling code for the current call only.
///
/// Used when the server re-targets a request (title generation, agents), and wins
/// over whatever the request itself names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallOverride {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for id in EndpointId::ALL {
            assert_eq!(id.as_str().parse::<EndpointId>().unwrap(), id);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("openai".parse::<EndpointId>().unwrap(), EndpointId::OpenAi);
        assert_eq!("managed-openai".parse::<EndpointId>().unwrap(), EndpointId::AzureOpenAi);
        assert_eq!("azure_openai".parse::<EndpointId>().unwrap(), EndpointId::AzureOpenAi);
        assert_eq!(
            "managed-assistants".parse::<EndpointId>().unwrap(),
            EndpointId::AzureAssistants
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "bedrock".parse::<EndpointId>().unwrap_err();
        assert!(matches!(err, ResolveError::UnknownEndpoint(ref e) if e == "bedrock"));
    }

    #[test]
    fn test_endpoint_serde_uses_wire_names() {
        let json = serde_json::to_value(EndpointId::AzureAssistants).unwrap();
        assert_eq!(json, "azureAssistants");
    }

    #[test]
    fn test_is_azure() {
        assert!(EndpointId::AzureOpenAi.is_azure());
        assert!(EndpointId::AzureAssistants.is_azure());
        assert!(!EndpointId::OpenAi.is_azure());
    }

    #[test]
    fn test_request_from_camel_case_json() {
        let json = serde_json::json!({
            "endpoint": "azureOpenAI",
            "model": "gpt-4o",
            "modelParameters": { "temperature": 0.2 },
            "keyExpiresAt": "2030-01-01T00:00:00Z",
            "user": { "id": "u1" },
            "overrides": { "streamRate": 12 }
        });

        let req: ChatRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.endpoint, "azureOpenAI");
        assert_eq!(req.model.as_deref(), Some("gpt-4o"));
        assert_eq!(req.model_parameters["temperature"], 0.2);
        assert!(req.key_expires_at.is_some());
        assert_eq!(req.user.id, "u1");
        assert_eq!(req.overrides.stream_rate, Some(12));
    }
}
