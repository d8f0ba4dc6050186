//! Azure deployment routing — model name → deployment group → connection settings.
//!
//! One logical Azure endpoint fronts many deployments (regions, serverless model
//! hosts). The deployment table maps each model to a group; the group carries the
//! key, URL, headers, and parameter policy for every model in it.
//!
//! A model with no routing entry is rejected. Substituting some other deployment
//! would bill the wrong capacity.

use serde::Serialize;
use tracing::debug;

use keyroute_core::config::{AzureConfig, AzureCredentials, AzureGroup};
use keyroute_core::types::{Headers, ModelParams};
use keyroute_core::utils::{substitute_user_vars, substitute_vars};
use keyroute_core::{ResolveError, UserContext};

/// Header carrying the key for serverless deployments.
pub const API_KEY_HEADER: &str = "api-key";
/// Query parameter carrying the Azure API version.
pub const API_VERSION_QUERY: &str = "api-version";

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// Native Azure auth settings for the transport (managed deployments only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMode {
    pub instance_name: String,
    pub deployment_name: String,
    pub api_version: String,
}

impl AzureMode {
    /// Azure mode from a static credential set.
    pub fn from_credentials(creds: &AzureCredentials) -> Self {
        Self {
            instance_name: creds.instance_name.clone(),
            deployment_name: creds.deployment_name.clone(),
            api_version: creds.api_version.clone(),
        }
    }
}

/// Everything the deployment table says about one model.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentRoute {
    pub group: String,
    pub model: String,
    pub deployment_name: Option<String>,
    pub api_version: Option<String>,
    pub api_key: String,
    pub base_url: String,
    pub headers: Headers,
    pub default_query: Headers,
    pub add_params: Option<ModelParams>,
    pub drop_params: Option<Vec<String>>,
    pub force_prompt: Option<bool>,
    pub serverless: bool,
    /// Set for managed deployments; `None` for serverless ones.
    pub azure: Option<AzureMode>,
    /// Cadence configured for this deployment (group, else table-wide).
    pub stream_rate: Option<u64>,
    /// Family default cadence, used only if nothing else sets one.
    pub default_stream_rate: u64,
}

// ─────────────────────────────────────────────
// Routing
// ─────────────────────────────────────────────

/// Route `model` through the deployment table.
///
/// `url_template` is used when the group has no `baseUrl` of its own.
pub fn route(
    model: &str,
    table: &AzureConfig,
    user: &UserContext,
    url_template: &str,
) -> Result<DeploymentRoute, ResolveError> {
    let entry = table
        .model_group_map
        .get(model)
        .ok_or_else(|| ResolveError::UnknownModel(model.to_string()))?;

    let group: &AzureGroup = table.group_map.get(&entry.group).ok_or_else(|| {
        debug!(model, group = %entry.group, "Model maps to a group missing from groupMap");
        ResolveError::UnknownModel(model.to_string())
    })?;

    if group.api_key.is_empty() {
        return Err(invalid(&entry.group, "apiKey is empty"));
    }

    let deployment_name = entry
        .deployment_name
        .clone()
        .or_else(|| group.deployment_name.clone());
    let api_version = entry.version.clone().or_else(|| group.version.clone());

    let mut headers = resolve_headers(&group.headers, user);
    let mut default_query = Headers::new();

    let (base_url, azure) = if group.serverless {
        let base_url = group
            .base_url
            .clone()
            .ok_or_else(|| invalid(&entry.group, "serverless groups need a baseUrl"))?;

        headers.insert(API_KEY_HEADER.to_string(), group.api_key.clone());
        if let Some(version) = &api_version {
            default_query.insert(API_VERSION_QUERY.to_string(), version.clone());
        }
        (base_url, None)
    } else {
        let instance_name = group
            .instance_name
            .clone()
            .ok_or_else(|| invalid(&entry.group, "instanceName is required"))?;
        let deployment_name = deployment_name
            .clone()
            .ok_or_else(|| invalid(&entry.group, "deploymentName is required"))?;

        let template = group.base_url.as_deref().unwrap_or(url_template);
        let base_url = construct_azure_url(template, &instance_name, &deployment_name);
        let azure = AzureMode {
            instance_name,
            deployment_name,
            api_version: api_version.clone().unwrap_or_default(),
        };
        (base_url, Some(azure))
    };

    debug!(
        model,
        group = %entry.group,
        serverless = group.serverless,
        base_url = %base_url,
        "Routed model to deployment group"
    );

    Ok(DeploymentRoute {
        group: entry.group.clone(),
        model: model.to_string(),
        deployment_name,
        api_version,
        api_key: group.api_key.clone(),
        base_url,
        headers,
        default_query,
        add_params: group.add_params.clone(),
        drop_params: group.drop_params.clone(),
        force_prompt: group.force_prompt,
        serverless: group.serverless,
        azure,
        stream_rate: group.stream_rate.or(table.stream_rate),
        default_stream_rate: table.stream_rate_policy.rate_for(model),
    })
}

/// Fill `${INSTANCE_NAME}` and `${DEPLOYMENT_NAME}` in an Azure URL template.
pub fn construct_azure_url(template: &str, instance_name: &str, deployment_name: &str) -> String {
    substitute_vars(
        template,
        &[
            ("INSTANCE_NAME", instance_name),
            ("DEPLOYMENT_NAME", deployment_name),
        ],
    )
}

/// Resolve `{{USER_ID}}`, `{{USER_EMAIL}}`, `{{USER_NAME}}` in header values.
pub fn resolve_headers(headers: &Headers, user: &UserContext) -> Headers {
    let vars = [
        ("USER_ID", user.id.as_str()),
        ("USER_EMAIL", user.email.as_deref().unwrap_or_default()),
        ("USER_NAME", user.name.as_deref().unwrap_or_default()),
    ];
    headers
        .iter()
        .map(|(name, value)| (name.clone(), substitute_user_vars(value, &vars)))
        .collect()
}

fn invalid(group: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidDeployment {
        group: group.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
