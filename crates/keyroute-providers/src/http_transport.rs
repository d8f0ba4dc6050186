//! OpenAI-compatible HTTP transport built from an [`EmittedClientConfig`].
//!
//! Only serves the chat-completions family (`openAI`, `azureOpenAI`,
//! `assistants`, `azureAssistants`); configs for `anthropic` and `google`
//! are rejected at construction.
//!
//! Auth follows the emitted config: Azure mode and `api-key` header configs
//! authenticate with the `api-key` header, everything else with a bearer token.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use keyroute_core::types::Headers;
use keyroute_core::EndpointId;

use crate::azure::{API_KEY_HEADER, API_VERSION_QUERY};
use crate::emit::EmittedClientConfig;
use crate::throttle::TokenPacer;

/// Header carrying the OpenAI organization id.
pub const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("endpoint '{0}' does not speak the chat completions API")]
    UnsupportedEndpoint(EndpointId),

    #[error("invalid proxy '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// One chat message in the request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The parts of a completion response a caller needs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────
// HttpTransport
// ─────────────────────────────────────────────

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: EndpointId,
    base_url: String,
    bearer: Option<String>,
    default_query: Headers,
    config: EmittedClientConfig,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .field("bearer", &self.bearer.is_some())
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &EmittedClientConfig) -> Result<Self, TransportError> {
        if matches!(config.endpoint, EndpointId::Anthropic | EndpointId::Google) {
            return Err(TransportError::UnsupportedEndpoint(config.endpoint));
        }

        let mut headers = to_header_map(&config.headers);
        let mut default_query = config.default_query.clone();

        let bearer = if let Some(azure) = &config.azure {
            insert_header(&mut headers, API_KEY_HEADER, &config.api_key);
            if !azure.api_version.is_empty() {
                default_query
                    .entry(API_VERSION_QUERY.to_string())
                    .or_insert_with(|| azure.api_version.clone());
            }
            None
        } else if config.headers.contains_key(API_KEY_HEADER) {
            None
        } else {
            Some(config.api_key.clone())
        };

        if let Some(org) = &config.organization {
            insert_header(&mut headers, ORGANIZATION_HEADER, org);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|source| TransportError::InvalidProxy {
                proxy: proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint,
            base_url: config.base_url.clone(),
            bearer,
            default_query,
            config: config.clone(),
        })
    }

    /// Full chat completions URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// A fresh pacer for one streamed response, if the config asks for pacing.
    pub fn pacer(&self) -> Option<TokenPacer> {
        self.config.stream_rate.map(|rate| rate.pacer())
    }

    /// Send one non-streaming completion with the emitted model options.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, TransportError> {
        let mut body = self.config.model_options.clone();
        body.insert(
            "messages".to_string(),
            serde_json::to_value(messages).unwrap_or_default(),
        );

        debug!(
            endpoint = %self.endpoint,
            model = self.config.model().unwrap_or("-"),
            messages = messages.len(),
            "Calling upstream"
        );

        let mut request = self
            .client
            .post(self.completions_url())
            .query(&self.default_query)
            .json(&body);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(endpoint = %self.endpoint, error = %e, "HTTP request failed");
            TransportError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(endpoint = %self.endpoint, status = %status, body = %body, "API error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionBody = response.json().await?;
        let choice = parsed.choices.into_iter().next();
        Ok(Completion {
            content: choice
                .as_ref()
                .and_then(|c| c.message.as_ref())
                .and_then(|m| m.content.clone()),
            finish_reason: choice.and_then(|c| c.finish_reason),
        })
    }
}

fn to_header_map(headers: &Headers) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        insert_header(&mut map, key, value);
    }
    map
}

fn insert_header(map: &mut HeaderMap, key: &str, value: &str) {
    match (
        HeaderName::from_bytes(key.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(mut val)) => {
            if name == API_KEY_HEADER || name == reqwest::header::AUTHORIZATION {
                val.set_sensitive(true);
            }
            map.insert(name, val);
        }
        _ => warn!(header = %key, "Skipping invalid header"),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
