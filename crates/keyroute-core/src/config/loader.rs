//! Config loader — reads `~/.keyroute/config.json`, migrates legacy keys,
//! and applies environment overrides.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.keyroute/config.json`
//! 3. Environment variables `KEYROUTE_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, EndpointConfig};
use crate::types::EndpointId;
use crate::utils::is_enabled;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    migrate_config(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// Moves `endpoints.<name>.reverseProxyUrl` → `endpoints.<name>.baseUrl`
/// unless `baseUrl` is already set.
fn migrate_config(raw: &mut serde_json::Value) {
    let Some(endpoints) = raw.get_mut("endpoints").and_then(|e| e.as_object_mut()) else {
        return;
    };

    for (name, section) in endpoints.iter_mut() {
        let Some(section) = section.as_object_mut() else {
            continue;
        };
        if let Some(legacy) = section.remove("reverseProxyUrl") {
            if !section.contains_key("baseUrl") {
                section.insert("baseUrl".to_string(), legacy);
                debug!("Migrated endpoints.{name}.reverseProxyUrl → endpoints.{name}.baseUrl");
            }
        }
    }
}

/// Env var section name for an endpoint.
fn env_section(id: EndpointId) -> &'static str {
    match id {
        EndpointId::OpenAi => "OPENAI",
        EndpointId::AzureOpenAi => "AZURE_OPENAI",
        EndpointId::Anthropic => "ANTHROPIC",
        EndpointId::Google => "GOOGLE",
        EndpointId::Assistants => "ASSISTANTS",
        EndpointId::AzureAssistants => "AZURE_ASSISTANTS",
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `KEYROUTE_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `KEYROUTE_ENDPOINTS__<NAME>__API_KEY` → `endpoints.<name>.api_key`
/// - `KEYROUTE_ENDPOINTS__<NAME>__BASE_URL` → `endpoints.<name>.base_url`
/// - `KEYROUTE_ENDPOINTS__<NAME>__STREAM_RATE` → `endpoints.<name>.stream_rate`
/// - `KEYROUTE_ENDPOINTS__<NAME>__USER_PROVIDES_KEY` → `endpoints.<name>.user_provides_key`
/// - `KEYROUTE_ALL__STREAM_RATE` → `all.stream_rate`
/// - `KEYROUTE_NETWORK__PROXY` / `__ORGANIZATION` / `__GOOGLE_AUTH_HEADER`
/// - `KEYROUTE_AZURE__API_KEY` / `__INSTANCE_NAME` / `__DEPLOYMENT_NAME` / `__API_VERSION`
fn apply_env_overrides(mut config: Config) -> Config {
    for id in EndpointId::ALL {
        apply_endpoint_env(config.endpoints.get_mut(id), env_section(id));
    }

    if let Some(rate) = env_u64("KEYROUTE_ALL__STREAM_RATE") {
        config.all.stream_rate = Some(rate);
    }

    // Network
    if let Ok(val) = std::env::var("KEYROUTE_NETWORK__PROXY") {
        config.network.proxy = Some(val);
    }
    if let Ok(val) = std::env::var("KEYROUTE_NETWORK__ORGANIZATION") {
        config.network.organization = Some(val);
    }
    if let Ok(val) = std::env::var("KEYROUTE_NETWORK__GOOGLE_AUTH_HEADER") {
        config.network.google_auth_header = is_enabled(&val);
    }

    // Static Azure credentials
    let azure = &mut config.azure_credentials;
    if let Ok(val) = std::env::var("KEYROUTE_AZURE__API_KEY") {
        azure.api_key = val;
    }
    if let Ok(val) = std::env::var("KEYROUTE_AZURE__INSTANCE_NAME") {
        azure.instance_name = val;
    }
    if let Ok(val) = std::env::var("KEYROUTE_AZURE__DEPLOYMENT_NAME") {
        azure.deployment_name = val;
    }
    if let Ok(val) = std::env::var("KEYROUTE_AZURE__API_VERSION") {
        azure.api_version = val;
    }

    config
}

/// Apply env var overrides for a single endpoint.
fn apply_endpoint_env(endpoint: &mut EndpointConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("KEYROUTE_ENDPOINTS__{name}__API_KEY")) {
        endpoint.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("KEYROUTE_ENDPOINTS__{name}__BASE_URL")) {
        endpoint.base_url = Some(val);
    }
    if let Some(rate) = env_u64(&format!("KEYROUTE_ENDPOINTS__{name}__STREAM_RATE")) {
        endpoint.stream_rate = Some(rate);
    }
    if let Ok(val) = std::env::var(format!("KEYROUTE_ENDPOINTS__{name}__USER_PROVIDES_KEY")) {
        endpoint.user_provides_key = is_enabled(&val);
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    match val.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring {name}: '{val}' is not a whole number");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert!(config.azure.is_none());
        assert!(!config.endpoints.anthropic.user_provides_key);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "endpoints": {
                "anthropic": { "apiKey": "sk-ant-1", "titleModel": "claude-3-haiku" }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.endpoints.anthropic.api_key, "sk-ant-1");
        assert_eq!(
            config.endpoints.anthropic.title_model.as_deref(),
            Some("claude-3-haiku")
        );
        assert!(!config.endpoints.openai.is_configured());
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert!(config.azure.is_none());
    }

    #[test]
    fn test_load_wrong_shape_returns_defaults() {
        let file = write_temp_json(r#"{ "endpoints": { "openAI": { "streamRate": "fast" } } }"#);
        let config = load_config_from_path(file.path());
        assert!(config.endpoints.openai.stream_rate.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.endpoints.google.api_key = "g-key".to_string();
        config.endpoints.google.title_model = Some("gemini-pro".to_string());

        save_config(&config, Some(path.as_path())).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.endpoints.google.api_key, "g-key");
        assert_eq!(reloaded.endpoints.google.title_model.as_deref(), Some("gemini-pro"));
    }

    #[test]
    fn test_migrate_reverse_proxy_url() {
        let file = write_temp_json(
            r#"{
            "endpoints": {
                "openAI": { "apiKey": "k", "reverseProxyUrl": "https://legacy.local/v1" }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(
            config.endpoints.openai.base_url.as_deref(),
            Some("https://legacy.local/v1")
        );
    }

    #[test]
    fn test_migrate_no_overwrite() {
        let file = write_temp_json(
            r#"{
            "endpoints": {
                "openAI": {
                    "baseUrl": "https://current.local/v1",
                    "reverseProxyUrl": "https://legacy.local/v1"
                }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(
            config.endpoints.openai.base_url.as_deref(),
            Some("https://current.local/v1")
        );
    }

    // Each env test uses its own variable so parallel tests do not interfere.

    #[test]
    fn test_env_override_endpoint_key() {
        std::env::set_var("KEYROUTE_ENDPOINTS__AZURE_ASSISTANTS__API_KEY", "sk-env-key");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.endpoints.azure_assistants.api_key, "sk-env-key");
        std::env::remove_var("KEYROUTE_ENDPOINTS__AZURE_ASSISTANTS__API_KEY");
    }

    #[test]
    fn test_env_override_user_provides_key() {
        std::env::set_var("KEYROUTE_ENDPOINTS__ASSISTANTS__USER_PROVIDES_KEY", "true");
        let config = apply_env_overrides(Config::default());
        assert!(config.endpoints.assistants.user_provides_key);
        std::env::remove_var("KEYROUTE_ENDPOINTS__ASSISTANTS__USER_PROVIDES_KEY");
    }

    #[test]
    fn test_env_override_global_stream_rate() {
        std::env::set_var("KEYROUTE_ALL__STREAM_RATE", "42");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.all.stream_rate, Some(42));
        std::env::remove_var("KEYROUTE_ALL__STREAM_RATE");
    }

    #[test]
    fn test_env_override_bad_number_ignored() {
        std::env::set_var("KEYROUTE_ENDPOINTS__GOOGLE__STREAM_RATE", "soon");
        let config = apply_env_overrides(Config::default());
        assert!(config.endpoints.google.stream_rate.is_none());
        std::env::remove_var("KEYROUTE_ENDPOINTS__GOOGLE__STREAM_RATE");
    }

    #[test]
    fn test_env_override_azure_instance() {
        std::env::set_var("KEYROUTE_AZURE__INSTANCE_NAME", "west-inst");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.azure_credentials.instance_name, "west-inst");
        std::env::remove_var("KEYROUTE_AZURE__INSTANCE_NAME");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(path.as_path())).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["endpoints"]["openAI"].get("userProvidesKey").is_some());
        assert!(raw["endpoints"]["openAI"].get("user_provides_key").is_none());
    }
}
