//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use keyroute_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("OpenAI key set: {}", cfg.endpoints.openai.is_configured());
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{
    AzureConfig, AzureCredentials, AzureGroup, Config, EndpointConfig, EndpointsConfig,
    FamilyRate, GlobalConfig, ModelGroupEntry, NetworkConfig, StreamRatePolicy,
};
