//! `keyroute status` — show configuration and endpoint credential status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use keyroute_core::config::{get_config_path, load_config, Config};
use keyroute_core::EndpointId;
use keyroute_providers::registry::ENDPOINTS;
use keyroute_providers::strategy_for;

/// Run the status command.
pub fn run(path: Option<&Path>) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let config = load_config(Some(config_path.as_path()));

    println!();
    println!("{}", "Keyroute Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );
    if let Some(proxy) = &config.network.proxy {
        println!("  {:<18} {}", "Proxy:".bold(), proxy);
    }
    if let Some(rate) = config.all.stream_rate {
        println!("  {:<18} {} ms", "Stream rate:".bold(), rate);
    }

    println!();
    println!("  {}", "Endpoints:".bold());
    for spec in ENDPOINTS {
        println!("    {:<20} {}", spec.display_name, endpoint_status(&config, spec.id));
    }

    if let Some(table) = &config.azure {
        println!();
        println!("  {}", "Deployment groups:".bold());
        let mut groups: Vec<_> = table.group_map.iter().collect();
        groups.sort_by(|a, b| a.0.cmp(b.0));
        for (name, group) in groups {
            let mut models: Vec<&str> = table
                .model_group_map
                .iter()
                .filter(|(_, entry)| &entry.group == name)
                .map(|(model, _)| model.as_str())
                .collect();
            models.sort_unstable();
            let kind = if group.serverless { "serverless" } else { "managed" };
            println!(
                "    {:<20} {} {}",
                name,
                kind.dimmed(),
                models.join(", ")
            );
        }
    }

    println!();
    Ok(())
}

/// One-line credential status for an endpoint.
fn endpoint_status(config: &Config, id: EndpointId) -> String {
    let strategy = strategy_for(id);
    if strategy.routing(config).is_some() {
        return crate::helpers::status_marker(true, "deployment table");
    }
    if config.endpoints.get(id).user_provides_key {
        return format!("{} (user provided)", "✓".green());
    }
    let configured = strategy
        .static_credentials(config)
        .map(|creds| !creds.api_key.is_empty() && creds.base_url.is_some())
        .unwrap_or(false);
    let detail = if id.is_azure() { "instance set" } else { "key set" };
    crate::helpers::status_marker(configured, detail)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_endpoint() {
        let status = endpoint_status(&Config::default(), EndpointId::OpenAi);
        assert!(status.contains("not configured"));
    }

    #[test]
    fn configured_endpoint() {
        let mut config = Config::default();
        config.endpoints.openai.api_key = "sk-test".into();
        assert!(endpoint_status(&config, EndpointId::OpenAi).contains("key set"));
    }

    #[test]
    fn azure_instance_endpoint() {
        let mut config = Config::default();
        config.azure_credentials.api_key = "az-key".into();
        config.azure_credentials.instance_name = "inst".into();
        config.azure_credentials.deployment_name = "dep".into();
        assert!(endpoint_status(&config, EndpointId::AzureOpenAi).contains("instance set"));
    }

    #[test]
    fn routed_endpoint() {
        let mut config = Config::default();
        config.azure = Some(Default::default());
        assert!(endpoint_status(&config, EndpointId::AzureOpenAi).contains("deployment table"));
    }
}
