//! Client initialization — the full request → emitted config pipeline.
//!
//! ```text
//! ChatRequest ─► CredentialResolver ─► (DeploymentRoute) ─► LayerStack ─► emit ─► EmittedClientConfig
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use keyroute_core::config::Config;
use keyroute_core::utils::mask_secret;
use keyroute_core::{CallOverride, ChatRequest, EndpointId, ResolveError};

use crate::azure::resolve_headers;
use crate::emit::{emit, EmittedClientConfig};
use crate::merge::{LayerKind, LayerStack, OptionLayer};
use crate::resolver::{CredentialResolver, CredentialSource, Credentials, ResolveContext};
use crate::strategy::{strategy_for, EndpointStrategy, StrategyContext};
use crate::traits::UserKeyStore;

/// Turns chat requests into ready-to-use client configurations.
///
/// Holds only shared, immutable state; one instance serves every request.
#[derive(Clone)]
pub struct ClientInitializer {
    resolver: CredentialResolver,
}

impl ClientInitializer {
    pub fn new(config: Arc<Config>, key_store: Arc<dyn UserKeyStore>) -> Self {
        Self {
            resolver: CredentialResolver::new(config, key_store),
        }
    }

    pub fn config(&self) -> &Config {
        self.resolver.config()
    }

    /// Resolve, merge, and emit the client config for one call.
    pub async fn initialize(
        &self,
        request: &ChatRequest,
        call: &CallOverride,
    ) -> Result<EmittedClientConfig, ResolveError> {
        let endpoint_name = call.endpoint.as_deref().unwrap_or(&request.endpoint);
        let endpoint: EndpointId = endpoint_name.parse()?;
        let strategy = strategy_for(endpoint);
        let config = self.config();

        let default_model = strategy.default_model(config);
        let model = call
            .model
            .as_deref()
            .or(request.model.as_deref())
            .or(default_model.as_deref());

        let ctx = ResolveContext {
            request,
            model,
            now: Utc::now(),
        };
        let resolution = self.resolver.resolve(endpoint, &ctx).await?;

        let strategy_ctx = StrategyContext { config, request };
        let mut stack = LayerStack::new();

        let family_rate = resolution.route.as_ref().map(|r| r.default_stream_rate);
        stack.set(
            LayerKind::Builtin,
            builtin_layer(strategy, default_model, family_rate),
        );
        stack.set(LayerKind::Global, global_layer(strategy, &strategy_ctx));
        stack.set(LayerKind::Request, request_layer(request));
        stack.set(
            LayerKind::Call,
            OptionLayer {
                model: call.model.clone(),
                ..Default::default()
            },
        );

        if let (Some(route), Some(table)) = (&resolution.route, strategy.routing(config)) {
            stack.set(LayerKind::Deployment, strategy.deployment_layer(route, table));
        }

        let slot = match resolution.source {
            CredentialSource::Static => LayerKind::Global,
            CredentialSource::Deployment => LayerKind::Deployment,
            CredentialSource::User => LayerKind::Request,
        };
        apply_credentials(stack.layer_mut(slot), &resolution.credentials);

        let mut merged = stack.merge(endpoint);
        strategy.finalize(&strategy_ctx, &mut merged, resolution.route.as_ref());

        let emitted = emit(merged, &request.user)?;
        info!(
            endpoint = %endpoint,
            model = emitted.model().unwrap_or("-"),
            base_url = %emitted.base_url,
            api_key = %mask_secret(&emitted.api_key),
            stream_rate = emitted.stream_rate.map(|r| r.interval_ms()),
            "Client initialized"
        );
        Ok(emitted)
    }

    /// [`initialize`](Self::initialize) bounded by a deadline.
    pub async fn initialize_with_timeout(
        &self,
        request: &ChatRequest,
        call: &CallOverride,
        timeout: Duration,
    ) -> Result<EmittedClientConfig, ResolveError> {
        tokio::time::timeout(timeout, self.initialize(request, call))
            .await
            .map_err(|_| ResolveError::TimedOut(timeout))?
    }
}

// ─────────────────────────────────────────────
// Layer builders
// ─────────────────────────────────────────────

fn builtin_layer(
    strategy: &dyn EndpointStrategy,
    default_model: Option<String>,
    family_rate: Option<u64>,
) -> OptionLayer {
    let spec = strategy.spec();
    OptionLayer {
        model: default_model,
        base_url: spec.default_base_url.map(str::to_string),
        title_method: spec.default_title_method.map(str::to_string),
        stream_rate: family_rate,
        ..Default::default()
    }
}

/// Per-endpoint config section, then the `all` section, then strategy extras.
fn global_layer(strategy: &dyn EndpointStrategy, ctx: &StrategyContext<'_>) -> OptionLayer {
    let section = ctx.config.endpoints.get(strategy.id());
    let mut layer = OptionLayer {
        base_url: section.base_url.clone(),
        headers: resolve_headers(&section.headers, &ctx.request.user),
        stream_rate: ctx.config.all.stream_rate.or(section.stream_rate),
        title_model: section.title_model.clone(),
        title_method: section.title_method.clone(),
        title_convo: section.title_convo,
        proxy: ctx.config.network.proxy.clone(),
        ..Default::default()
    };

    let extra = strategy.endpoint_layer(ctx);
    layer.headers.extend(extra.headers);
    if extra.organization.is_some() {
        layer.organization = extra.organization;
    }
    layer
}

fn request_layer(request: &ChatRequest) -> OptionLayer {
    let overrides = &request.overrides;
    OptionLayer {
        model: request.model.clone(),
        headers: resolve_headers(&overrides.headers, &request.user),
        model_params: request.model_parameters.clone(),
        stream_rate: overrides.stream_rate,
        title_model: overrides.title_model.clone(),
        ..Default::default()
    }
}

fn apply_credentials(layer: &mut OptionLayer, credentials: &Credentials) {
    debug!(api_key = %mask_secret(&credentials.api_key), "Placing credentials");
    layer.api_key = Some(credentials.api_key.clone());
    if let Some(base_url) = &credentials.base_url {
        layer.base_url = Some(base_url.clone());
    }
    if let Some(azure) = &credentials.azure {
        layer.azure = Some(azure.clone());
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
