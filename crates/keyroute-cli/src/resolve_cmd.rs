//! `keyroute resolve` — run the full pipeline for one endpoint and print the
//! emitted client config with secrets masked.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Args;
use colored::Colorize;
use tracing::info;

use keyroute_core::config::load_config;
use keyroute_core::{CallOverride, ChatRequest, EndpointId};
use keyroute_providers::{ClientInitializer, MemoryKeyStore, StoredUserKey, UserKeyValues};

use crate::helpers::parse_param;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Endpoint name (openAI, azureOpenAI, anthropic, google, assistants, azureAssistants)
    pub endpoint: String,

    /// Model to resolve
    #[arg(short, long)]
    pub model: Option<String>,

    /// User id the request is made for
    #[arg(short, long, default_value = "cli")]
    pub user: String,

    /// Model parameter as key=value (repeatable)
    #[arg(short, long = "param")]
    pub params: Vec<String>,

    /// Stream rate override in milliseconds
    #[arg(long)]
    pub stream_rate: Option<u64>,

    /// Key to use for endpoints where users provide their own
    #[arg(long)]
    pub user_key: Option<String>,

    /// Minutes until the user key expires (negative for an expired key)
    #[arg(long, allow_hyphen_values = true)]
    pub user_key_expires_in: Option<i64>,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub logs: bool,
}

/// Run the resolve command.
pub async fn run(path: Option<&Path>, args: ResolveArgs) -> Result<()> {
    let config = Arc::new(load_config(path));
    let endpoint: EndpointId = args.endpoint.parse()?;

    let store = MemoryKeyStore::new();
    if let Some(key) = &args.user_key {
        let expires_at = args
            .user_key_expires_in
            .map(|minutes| Utc::now() + ChronoDuration::minutes(minutes));
        store
            .insert(
                args.user.clone(),
                endpoint,
                StoredUserKey {
                    values: UserKeyValues {
                        api_key: key.clone(),
                        base_url: None,
                    },
                    expires_at,
                },
            )
            .await;
    }

    let request = build_request(&args)?;
    let initializer = ClientInitializer::new(config, Arc::new(store));
    info!(endpoint = %endpoint, model = ?request.model, "Resolving client config");

    let emitted = initializer
        .initialize_with_timeout(
            &request,
            &CallOverride::default(),
            Duration::from_secs(args.timeout),
        )
        .await
        .with_context(|| format!("failed to resolve {endpoint}"))?;

    println!();
    println!("{}", format!("Resolved {endpoint}").cyan().bold());
    println!("{}", serde_json::to_string_pretty(&emitted.redacted())?);
    println!();
    Ok(())
}

fn build_request(args: &ResolveArgs) -> Result<ChatRequest> {
    let mut request = ChatRequest {
        endpoint: args.endpoint.clone(),
        model: args.model.clone(),
        ..Default::default()
    };
    request.user.id = args.user.clone();
    request.overrides.stream_rate = args.stream_rate;
    for raw in &args.params {
        let (key, value) = parse_param(raw)?;
        request.model_parameters.insert(key, value);
    }
    Ok(request)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn args(endpoint: &str) -> ResolveArgs {
        ResolveArgs {
            endpoint: endpoint.into(),
            model: Some("gpt-4o".into()),
            user: "u1".into(),
            params: vec!["temperature=0.2".into(), "stop=END".into()],
            stream_rate: Some(12),
            user_key: None,
            user_key_expires_in: None,
            timeout: 10,
            logs: false,
        }
    }

    #[test]
    fn builds_request_from_args() {
        let request = build_request(&args("openAI")).unwrap();
        assert_eq!(request.user.id, "u1");
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.overrides.stream_rate, Some(12));
        assert_eq!(request.model_parameters["temperature"], serde_json::json!(0.2));
        assert_eq!(request.model_parameters["stop"], "END");
    }

    #[test]
    fn rejects_bad_param() {
        let mut bad = args("openAI");
        bad.params = vec!["oops".into()];
        assert!(build_request(&bad).is_err());
    }

    #[tokio::test]
    async fn resolves_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "endpoints": { "anthropic": { "apiKey": "sk-ant-1234567890" } } }"#,
        )
        .unwrap();

        let mut a = args("anthropic");
        a.params.clear();
        run(Some(path.as_path()), a).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_endpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(run(Some(path.as_path()), args("bedrock")).await.is_err());
    }
}
