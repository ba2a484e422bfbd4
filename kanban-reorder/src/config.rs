//! Engine configuration loaded with Figment
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. `reorder.{toml,yaml,yml,json}` in the board directory, if present
//! 3. Environment variables prefixed with `KANBAN_REORDER_`
//!
//! ```text
//! KANBAN_REORDER_ACTIVATION_DISTANCE_PX=4     # → activation_distance_px
//! KANBAN_REORDER_LIST_SWITCH_OVERLAP_RATIO=.5 # → list_switch_overlap_ratio
//! ```

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, trace};

/// Pointer travel (in px) before a press turns into a drag.
pub const DEFAULT_ACTIVATION_DISTANCE_PX: f64 = 10.0;

/// Fraction of a hovered list's width the dragged list must cover to jump past it.
pub const DEFAULT_LIST_SWITCH_OVERLAP_RATIO: f64 = 0.35;

/// Position given to the first entry of an empty container.
pub const DEFAULT_POSITION_BASE: f64 = 1.0;

/// Gap used when appending or prepending.
pub const DEFAULT_POSITION_STEP: f64 = 2.0;

/// Capacity of the store and realtime broadcast channels.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "KANBAN_REORDER_";

/// Base name of the optional config file inside a board directory
pub const CONFIG_FILE_STEM: &str = "reorder";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration parsing failed
    #[error("Failed to parse configuration: {source}")]
    ParseError { source: Box<figment::Error> },

    /// Invalid configuration value
    #[error("Invalid configuration value for key '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::ParseError {
            source: Box::new(error),
        }
    }
}

/// Tunables for drag activation, hysteresis and position math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    pub activation_distance_px: f64,
    pub list_switch_overlap_ratio: f64,
    pub position_base: f64,
    pub position_step: f64,
    /// Refetch the touched containers after a confirmed write
    pub reconcile_after_write: bool,
    pub event_buffer: usize,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            activation_distance_px: DEFAULT_ACTIVATION_DISTANCE_PX,
            list_switch_overlap_ratio: DEFAULT_LIST_SWITCH_OVERLAP_RATIO,
            position_base: DEFAULT_POSITION_BASE,
            position_step: DEFAULT_POSITION_STEP,
            reconcile_after_write: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ReorderConfig {
    /// Load and validate configuration for an optional board directory.
    pub fn load(board_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let config: ReorderConfig = Self::figment(board_dir).extract()?;
        config.validate()?;
        debug!(
            activation_distance_px = config.activation_distance_px,
            list_switch_overlap_ratio = config.list_switch_overlap_ratio,
            "loaded reorder configuration"
        );
        Ok(config)
    }

    /// Build the layered figment without extracting it
    pub fn figment(board_dir: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ReorderConfig::default()));

        if let Some(dir) = board_dir {
            for ext in ["toml", "yaml", "yml", "json"] {
                let path = dir.join(format!("{CONFIG_FILE_STEM}.{ext}"));
                if !path.is_file() {
                    continue;
                }
                trace!("Loading config file: {}", path.display());
                figment = match ext {
                    "toml" => figment.merge(Toml::file(&path)),
                    "json" => figment.merge(Json::file(&path)),
                    _ => figment.merge(Yaml::file(&path)),
                };
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }

    /// Reject values that would make the engine misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.activation_distance_px.is_finite() && self.activation_distance_px > 0.0) {
            return Err(ConfigError::invalid(
                "activation_distance_px",
                "must be a finite, positive distance",
            ));
        }
        if !(self.list_switch_overlap_ratio > 0.0 && self.list_switch_overlap_ratio <= 1.0) {
            return Err(ConfigError::invalid(
                "list_switch_overlap_ratio",
                "must be in (0, 1]",
            ));
        }
        if !self.position_base.is_finite() {
            return Err(ConfigError::invalid("position_base", "must be finite"));
        }
        if !(self.position_step.is_finite() && self.position_step > 0.0) {
            return Err(ConfigError::invalid(
                "position_step",
                "must be a finite, positive gap",
            ));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::invalid("event_buffer", "must be non-zero"));
        }
        Ok(())
    }
}
