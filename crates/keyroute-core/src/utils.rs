//! Utility helpers — data path resolution, secret masking, placeholder substitution.

use std::path::PathBuf;

/// Get the Keyroute data directory (e.g. `~/.keyroute/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".keyroute")
}

/// Mask a secret for logging: keep a short prefix, hide the rest.
///
/// Short secrets are fully hidden so the prefix never reveals most of the key.
pub fn mask_secret(secret: &str) -> String {
    const VISIBLE: usize = 6;
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    if secret.chars().count() <= VISIBLE * 2 {
        return "***".to_string();
    }
    let prefix: String = secret.chars().take(VISIBLE).collect();
    format!("{prefix}...")
}

/// Replace every `${NAME}` in `template` with the matching value.
///
/// Unknown placeholders are left untouched.
pub fn substitute_vars(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("${{{name}}}"), value);
    }
    out
}

/// Replace every `{{NAME}}` in `template` with the matching value.
pub fn substitute_user_vars(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

/// Parse a boolean-ish env value (`"true"`, `"1"`, `"yes"`).
pub fn is_enabled(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_long_secret() {
        assert_eq!(mask_secret("sk-abcdefghijklmnop"), "sk-abc...");
    }

    #[test]
    fn test_mask_short_secret() {
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret(""), "<empty>");
    }

    #[test]
    fn test_substitute_vars() {
        let url = substitute_vars(
            "https://${INSTANCE_NAME}.openai.azure.com/openai/deployments/${DEPLOYMENT_NAME}",
            &[("INSTANCE_NAME", "east"), ("DEPLOYMENT_NAME", "gpt4o")],
        );
        assert_eq!(url, "https://east.openai.azure.com/openai/deployments/gpt4o");
    }

    #[test]
    fn test_substitute_vars_leaves_unknown() {
        let out = substitute_vars("${A}-${B}", &[("A", "1")]);
        assert_eq!(out, "1-${B}");
    }

    #[test]
    fn test_substitute_user_vars() {
        let out = substitute_user_vars("user={{USER_ID}}", &[("USER_ID", "u-42")]);
        assert_eq!(out, "user=u-42");
    }

    #[test]
    fn test_is_enabled() {
        assert!(is_enabled("true"));
        assert!(is_enabled(" 1 "));
        assert!(is_enabled("YES"));
        assert!(!is_enabled("false"));
        assert!(!is_enabled(""));
    }

    #[test]
    fn test_data_path_ends_with_keyroute() {
        let path = get_data_path();
        assert!(path.ends_with(".keyroute"));
    }
}
