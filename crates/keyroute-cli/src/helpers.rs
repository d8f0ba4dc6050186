//! Shared CLI helpers — path expansion, parameter parsing, status markers.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::Value;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Parse a `key=value` model parameter. The value is read as JSON when it
/// parses, otherwise kept as a plain string.
pub fn parse_param(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected key=value, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("parameter name is empty in '{raw}'");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Green check or dimmed "not configured" marker.
pub fn status_marker(configured: bool, detail: &str) -> String {
    if configured {
        format!("{} ({detail})", "✓".green())
    } else {
        format!("{}", "· not configured".dimmed())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/foo/bar");
        assert!(result.ends_with("foo/bar"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        let result = expand_tilde("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn parse_param_json_value() {
        let (key, value) = parse_param("temperature=0.5").unwrap();
        assert_eq!(key, "temperature");
        assert_eq!(value, serde_json::json!(0.5));
    }

    #[test]
    fn parse_param_string_fallback() {
        let (key, value) = parse_param("stop=END").unwrap();
        assert_eq!(key, "stop");
        assert_eq!(value, Value::String("END".into()));
    }

    #[test]
    fn parse_param_rejects_missing_equals() {
        assert!(parse_param("temperature").is_err());
        assert!(parse_param("=1").is_err());
    }
}
