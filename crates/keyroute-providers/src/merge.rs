//! Option merging — an explicit, ordered stack of option layers.
//!
//! # Precedence (lowest → highest)
//! 1. [`LayerKind::Builtin`] — registry defaults, family cadence
//! 2. [`LayerKind::Global`] — per-endpoint settings, then `all`
//! 3. [`LayerKind::Deployment`] — deployment routing output
//! 4. [`LayerKind::Request`] — request-scoped overrides
//! 5. [`LayerKind::Call`] — explicit model override for this call
//!
//! Scalars: last writer wins. Headers, default query, and model parameters:
//! key-wise shallow merge, last writer wins per key.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use keyroute_core::types::{Headers, ModelParams};
use keyroute_core::EndpointId;

use crate::azure::AzureMode;

// ─────────────────────────────────────────────
// Layers
// ─────────────────────────────────────────────

/// Position of a layer in the precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    Builtin,
    Global,
    Deployment,
    Request,
    Call,
}

/// One partial set of options. Unset fields leave lower layers untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionLayer {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub headers: Headers,
    pub default_query: Headers,
    pub model_params: ModelParams,
    /// Parameters this layer removes from the outgoing request.
    pub drop_params: Vec<String>,
    /// Parameters this layer inserts or overwrites, applied after its drops.
    pub add_params: ModelParams,
    pub stream_rate: Option<u64>,
    pub title_model: Option<String>,
    pub title_method: Option<String>,
    pub title_convo: Option<bool>,
    pub force_prompt: Option<bool>,
    pub proxy: Option<String>,
    pub organization: Option<String>,
    pub serverless: Option<bool>,
    pub azure: Option<AzureMode>,
}

/// Title-generation settings carried to the client.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convo: Option<bool>,
}

// ─────────────────────────────────────────────
// Parameter policy
// ─────────────────────────────────────────────

/// Accumulated drop/add adjustments, kept in normalized form.
///
/// Folding a layer `(drop D, add A)` into `(drop D0, add A0)` yields
/// `(drop D0 ∪ D, add (A0 − D) + A)`, which applies identically to running each
/// layer's drop-then-add in sequence. The normal form makes folding idempotent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamPolicy {
    pub drop: BTreeSet<String>,
    pub add: ModelParams,
}

impl ParamPolicy {
    /// Fold one layer's adjustments in (drop first, then add).
    pub fn absorb(&mut self, drop: &[String], add: &ModelParams) {
        for key in drop {
            self.add.remove(key);
            self.drop.insert(key.clone());
        }
        for (key, value) in add {
            self.add.insert(key.clone(), value.clone());
        }
    }

    /// Apply to an assembled parameter object: remove dropped keys, then insert adds.
    pub fn apply(&self, params: &mut ModelParams) {
        for key in &self.drop {
            params.remove(key);
        }
        for (key, value) in &self.add {
            params.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.drop.is_empty() && self.add.is_empty()
    }
}

// ─────────────────────────────────────────────
// MergedOptions
// ─────────────────────────────────────────────

/// The accumulated options after folding every layer.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedOptions {
    pub endpoint: EndpointId,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub headers: Headers,
    pub default_query: Headers,
    pub model_params: ModelParams,
    pub params: ParamPolicy,
    pub stream_rate: Option<u64>,
    pub title: TitleSettings,
    pub force_prompt: Option<bool>,
    pub proxy: Option<String>,
    pub organization: Option<String>,
    pub serverless: bool,
    pub azure: Option<AzureMode>,
}

impl MergedOptions {
    pub fn new(endpoint: EndpointId) -> Self {
        Self {
            endpoint,
            model: None,
            api_key: None,
            base_url: None,
            headers: Headers::new(),
            default_query: Headers::new(),
            model_params: ModelParams::new(),
            params: ParamPolicy::default(),
            stream_rate: None,
            title: TitleSettings::default(),
            force_prompt: None,
            proxy: None,
            organization: None,
            serverless: false,
            azure: None,
        }
    }

    /// Fold one layer on top of the current state.
    pub fn apply(&mut self, layer: &OptionLayer) {
        overwrite(&mut self.model, &layer.model);
        overwrite(&mut self.api_key, &layer.api_key);
        overwrite(&mut self.base_url, &layer.base_url);
        overwrite(&mut self.stream_rate, &layer.stream_rate);
        overwrite(&mut self.title.model, &layer.title_model);
        overwrite(&mut self.title.method, &layer.title_method);
        overwrite(&mut self.title.convo, &layer.title_convo);
        overwrite(&mut self.force_prompt, &layer.force_prompt);
        overwrite(&mut self.proxy, &layer.proxy);
        overwrite(&mut self.organization, &layer.organization);
        overwrite(&mut self.azure, &layer.azure);
        if let Some(serverless) = layer.serverless {
            self.serverless = serverless;
        }

        extend(&mut self.headers, &layer.headers);
        extend(&mut self.default_query, &layer.default_query);
        for (key, value) in &layer.model_params {
            self.model_params.insert(key.clone(), value.clone());
        }

        self.params.absorb(&layer.drop_params, &layer.add_params);
    }
}

fn overwrite<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if let Some(v) = value {
        *slot = Some(v.clone());
    }
}

fn extend(target: &mut Headers, source: &Headers) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Fold layers in the order given. The single merge function.
pub fn merge<'a>(
    endpoint: EndpointId,
    layers: impl IntoIterator<Item = &'a OptionLayer>,
) -> MergedOptions {
    let mut merged = MergedOptions::new(endpoint);
    for layer in layers {
        merged.apply(layer);
    }
    merged
}

// ─────────────────────────────────────────────
// LayerStack
// ─────────────────────────────────────────────

/// Layers keyed by their precedence slot; merged in `LayerKind` order no matter
/// the order they were filled in.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: BTreeMap<LayerKind, OptionLayer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to a slot, creating an empty layer if needed.
    pub fn layer_mut(&mut self, kind: LayerKind) -> &mut OptionLayer {
        self.layers.entry(kind).or_default()
    }

    /// Replace a slot wholesale.
    pub fn set(&mut self, kind: LayerKind, layer: OptionLayer) {
        self.layers.insert(kind, layer);
    }

    pub fn merge(&self, endpoint: EndpointId) -> MergedOptions {
        merge(endpoint, self.layers.values())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
