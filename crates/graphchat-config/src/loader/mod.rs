//! Layered configuration loader.
//!
//! Discovers configuration layers (user/project/cwd/runtime), validates their
//! schema, merges them, applies environment overrides, and produces a final
//! `GraphChatConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;


use crate::{ConfigError, GraphChatConfig, TransportKind};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "graphchat.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".graphchat";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];
/// Environment variable that overrides `backend.base_url`.
pub const ENV_API_BASE_URL: &str = "GRAPHCHAT_API_BASE_URL";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: GraphChatConfig,
    /// Metadata for each layer considered during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides from the command line.
    Runtime,
    /// Environment variable overrides (highest precedence).
    Env,
}

/// Metadata about a config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk if present.
    pub path: Option<PathBuf>,
}

/// Schema validation mode for layered configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaMode {
    /// Partial validation for non-final layers.
    Partial,
    /// Full validation for the effective config.
    Full,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve local layers.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.graphchat/graphchat.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after file layers.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
    /// Base URL taken from the environment, applied last.
    pub env_base_url: Option<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        let cwd = cwd.as_ref().to_path_buf();
        Self {
            cwd,
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            env_base_url: std::env::var(ENV_API_BASE_URL)
                .ok()
                .filter(|value| !value.trim().is_empty()),
        }
    }

    /// Add a runtime override config path that is applied after file layers.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl GraphChatConfig {
    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): user, project, cwd, runtime, env.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merge_layers = Vec::new();
        let mut seen_paths = HashSet::new();

        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        match utils::find_project_root(&cwd, &options.project_root_markers) {
            Some(project_root) => {
                debug!("resolved project root: {}", project_root.display());
                candidates.push((
                    ConfigLayerSource::Project,
                    project_root.join(DEFAULT_CONFIG_FILE),
                ));
            }
            None => debug!("project root not found; skipping project layer"),
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

        for (source, path) in candidates {
            load_local_layer(
                source,
                &path,
                &mut layers,
                &mut merge_layers,
                &mut seen_paths,
            )?;
        }

        for runtime_path in &options.runtime_paths {
            let loaded = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            layers.push(loaded.meta.clone());
            merge_layers.push(loaded);
        }

        if let Some(base_url) = options.env_base_url.as_ref() {
            debug!("applying {} override", ENV_API_BASE_URL);
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Env,
                path: None,
            });
            merge_layers.push(LoadedLayer {
                meta: ConfigLayer {
                    source: ConfigLayerSource::Env,
                    path: None,
                },
                value: serde_json::json!({ "backend": { "base_url": base_url } }),
            });
        }

        let mut merged = Value::Object(serde_json::Map::new());
        for layer in merge_layers {
            merge::merge_json_values(&mut merged, &layer.value);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let backend = &self.backend;
        if !(backend.base_url.starts_with("http://") || backend.base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidField {
                path: "backend.base_url".to_string(),
                message: "expected an http:// or https:// url".to_string(),
            });
        }
        if !backend.endpoint_path.starts_with('/') {
            return Err(ConfigError::InvalidField {
                path: "backend.endpoint_path".to_string(),
                message: "expected a path starting with '/'".to_string(),
            });
        }
        if backend.timeout_secs == 0 {
            return Err(ConfigError::InvalidField {
                path: "backend.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if backend.transport == TransportKind::Websocket
            && let Some(ws_url) = &backend.ws_url
            && !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://"))
        {
            return Err(ConfigError::InvalidField {
                path: "backend.ws_url".to_string(),
                message: "expected a ws:// or wss:// url".to_string(),
            });
        }
        if self
            .ui
            .suggestions
            .iter()
            .any(|question| question.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "ui.suggestions must not contain blank questions".to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<GraphChatConfig, ConfigError> {
    schema::validate_layer_schema(&value, SchemaMode::Full, label)?;
    let config: GraphChatConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

fn load_local_layer(
    source: ConfigLayerSource,
    path: &Path,
    layers: &mut Vec<ConfigLayer>,
    merge_layers: &mut Vec<LoadedLayer>,
    seen_paths: &mut HashSet<PathBuf>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        debug!(
            "skipping missing layer (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(());
    }
    if !seen_paths.insert(utils::unique_path(path)) {
        debug!(
            "skipping duplicate layer (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(());
    }
    let loaded = layer_io::load_required_layer(source, path)?;
    debug!(
        "loaded layer (source={:?}, path={})",
        source,
        path.display()
    );
    layers.push(loaded.meta.clone());
    merge_layers.push(loaded);
    Ok(())
}
