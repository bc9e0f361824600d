//! Configuration models and layered config loading.
//!
//! This crate owns the graphchat config schema, validation, and the
//! layer-merging logic used by the terminal client.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{
    ConfigLayer, ConfigLayerSource, ENV_API_BASE_URL, LayeredConfig, LayeredConfigOptions,
};
/// Configuration schema models.
pub use model::*;
