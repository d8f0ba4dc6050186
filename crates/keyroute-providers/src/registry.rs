//! Endpoint registry — static specs for the six supported endpoints.
//!
//! Each `EndpointSpec` describes the built-in defaults for one endpoint:
//! display name, default base URL, default model, and title method.
//! These form the lowest-precedence option layer.

use keyroute_core::EndpointId;

/// URL template for Azure chat deployments.
pub const AZURE_CHAT_URL_TEMPLATE: &str =
    "https://${INSTANCE_NAME}.openai.azure.com/openai/deployments/${DEPLOYMENT_NAME}";

/// URL template for Azure Assistants (deployment is chosen per request, not per URL).
pub const AZURE_ASSISTANTS_URL_TEMPLATE: &str = "https://${INSTANCE_NAME}.openai.azure.com/openai";

// ─────────────────────────────────────────────
// EndpointSpec — static metadata for one endpoint
// ─────────────────────────────────────────────

/// Static specification describing one endpoint.
#[derive(Clone, Debug)]
pub struct EndpointSpec {
    pub id: EndpointId,
    /// Human-readable name for logs. E.g. `"Azure OpenAI"`.
    pub display_name: &'static str,
    /// Base URL used when neither config nor routing supplies one.
    /// `None` for Azure endpoints, whose URL is built from instance/deployment.
    pub default_base_url: Option<&'static str>,
    /// Model used when the request names none.
    pub default_model: Option<&'static str>,
    /// Default title-generation method.
    pub default_title_method: Option<&'static str>,
}

/// Complete list of supported endpoint specifications.
pub static ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        id: EndpointId::OpenAi,
        display_name: "OpenAI",
        default_base_url: Some("https://api.openai.com/v1"),
        default_model: Some("gpt-4o-mini"),
        default_title_method: None,
    },
    EndpointSpec {
        id: EndpointId::AzureOpenAi,
        display_name: "Azure OpenAI",
        default_base_url: None,
        default_model: None,
        default_title_method: Some("completion"),
    },
    EndpointSpec {
        id: EndpointId::Anthropic,
        display_name: "Anthropic",
        default_base_url: Some("https://api.anthropic.com/v1"),
        default_model: Some("claude-3-5-sonnet-latest"),
        default_title_method: None,
    },
    EndpointSpec {
        id: EndpointId::Google,
        display_name: "Google",
        default_base_url: Some("https://generativelanguage.googleapis.com/v1beta"),
        default_model: Some("gemini-1.5-pro"),
        default_title_method: None,
    },
    EndpointSpec {
        id: EndpointId::Assistants,
        display_name: "Assistants",
        default_base_url: Some("https://api.openai.com/v1"),
        default_model: Some("gpt-4o"),
        default_title_method: None,
    },
    EndpointSpec {
        id: EndpointId::AzureAssistants,
        display_name: "Azure Assistants",
        default_base_url: None,
        default_model: None,
        default_title_method: Some("completion"),
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find the spec for an endpoint. Every `EndpointId` has exactly one.
pub fn find_by_id(id: EndpointId) -> &'static EndpointSpec {
    ENDPOINTS
        .iter()
        .find(|spec| spec.id == id)
        .unwrap_or_else(|| unreachable!("registry covers every EndpointId"))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_endpoint_has_a_spec() {
        for id in EndpointId::ALL {
            assert_eq!(find_by_id(id).id, id);
        }
        assert_eq!(ENDPOINTS.len(), EndpointId::ALL.len());
    }

    #[test]
    fn test_azure_endpoints_have_no_default_url() {
        assert!(find_by_id(EndpointId::AzureOpenAi).default_base_url.is_none());
        assert!(find_by_id(EndpointId::AzureAssistants).default_base_url.is_none());
        assert!(find_by_id(EndpointId::OpenAi).default_base_url.is_some());
    }
}
