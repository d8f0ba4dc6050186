//! Config emission — merged options → the value object a transport is built from.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use keyroute_core::types::{Headers, ModelParams};
use keyroute_core::utils::mask_secret;
use keyroute_core::{EndpointId, ResolveError, UserContext};

use crate::azure::{AzureMode, API_KEY_HEADER};
use crate::merge::{MergedOptions, TitleSettings};
use crate::throttle::StreamRate;

/// A fully resolved client configuration. Never mutated after emission.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedClientConfig {
    pub endpoint: EndpointId,
    pub api_key: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub headers: Headers,
    pub default_query: Headers,
    pub model_options: ModelParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<StreamRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureMode>,
    pub legacy_content_mode: bool,
    pub force_prompt: bool,
    pub title: TitleSettings,
}

impl EmittedClientConfig {
    /// The model this config targets, if one was resolved.
    pub fn model(&self) -> Option<&str> {
        self.model_options.get("model").and_then(Value::as_str)
    }

    /// Copy with every secret masked, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = mask_secret(&self.api_key);
        if let Some(value) = copy.headers.get_mut(API_KEY_HEADER) {
            *value = mask_secret(value);
        }
        copy
    }
}

impl fmt::Debug for EmittedClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = self.redacted();
        f.debug_struct("EmittedClientConfig")
            .field("endpoint", &redacted.endpoint)
            .field("api_key", &redacted.api_key)
            .field("base_url", &redacted.base_url)
            .field("headers", &redacted.headers)
            .field("default_query", &redacted.default_query)
            .field("model_options", &redacted.model_options)
            .field("proxy", &redacted.proxy)
            .field("organization", &redacted.organization)
            .field("stream_rate", &redacted.stream_rate)
            .field("azure", &redacted.azure)
            .field("legacy_content_mode", &redacted.legacy_content_mode)
            .field("force_prompt", &redacted.force_prompt)
            .field("title", &redacted.title)
            .finish()
    }
}

/// Emit the final client config. All-or-nothing: a missing key or base URL
/// fails the whole emission.
pub fn emit(merged: MergedOptions, user: &UserContext) -> Result<EmittedClientConfig, ResolveError> {
    let api_key = merged
        .api_key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ResolveError::missing_credential(merged.endpoint))?;
    let base_url = merged
        .base_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ResolveError::missing_credential(merged.endpoint))?;

    let mut model_options = merged.model_params;
    if let Some(model) = &merged.model {
        model_options.insert("model".to_string(), Value::String(model.clone()));
    }
    if !user.id.is_empty() {
        model_options.insert("user".to_string(), Value::String(user.id.clone()));
    }
    merged.params.apply(&mut model_options);
    if let Some(model) = merged.model {
        model_options.insert("model".to_string(), Value::String(model));
    }

    Ok(EmittedClientConfig {
        endpoint: merged.endpoint,
        api_key,
        base_url,
        headers: merged.headers,
        default_query: merged.default_query,
        model_options,
        proxy: merged.proxy,
        organization: merged.organization,
        stream_rate: merged.stream_rate.and_then(StreamRate::from_millis),
        azure: merged.azure,
        legacy_content_mode: merged.serverless,
        force_prompt: merged.force_prompt.unwrap_or(false),
        title: merged.title,
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
