//! # Floodlab Configuration System
//!
//! Hierarchical configuration for the experiment harness.
//!
//! ## Features
//! - **Unified Configuration**: single source of truth across all components
//! - **Validation**: runtime validation of critical parameters
//! - **Environment Awareness**: `FLOODLAB_*` variables override file values
//!
//! All configuration is loaded once, validated, and passed immutably into
//! the orchestrator and mitigation controller at construction; there is no
//! process-wide mutable state.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod attack;
mod detection;
mod error;
mod experiment;
mod mitigation;
mod probe;
mod validation;

pub use attack::AttackConfig;
pub use detection::DetectionConfig;
pub use error::ConfigError;
pub use experiment::ExperimentConfig;
pub use mitigation::MitigationConfig;
pub use probe::ProbeConfig;

/// Top-level configuration container for a run.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct FloodlabConfig {
    /// Cycle count, cooldowns, and the legitimate-host whitelist.
    #[validate(nested)]
    pub experiment: ExperimentConfig,

    /// Probe counts, pacing, and deadlines.
    #[validate(nested)]
    pub probe: ProbeConfig,

    /// Detection thresholds and background-monitor parameters.
    #[validate(nested)]
    pub detection: DetectionConfig,

    /// Mitigation enable flags and strategy parameters.
    #[validate(nested)]
    pub mitigation: MitigationConfig,

    /// Flood-generator parameters.
    #[validate(nested)]
    pub attack: AttackConfig,
}

impl FloodlabConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/floodlab.yaml` - base settings. If missing, defaults are used.
    /// 3. `FLOODLAB_*` environment variables (split on `__`).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(FloodlabConfig::default()));

        if Path::new("config/floodlab.yaml").exists() {
            figment = figment.merge(Yaml::file("config/floodlab.yaml"));
        }

        figment
            .merge(Env::prefixed("FLOODLAB_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(FloodlabConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("FLOODLAB_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_validation() {
        let config = FloodlabConfig::default();
        config.validate().expect("Default config should validate");
    }

    #[test]
    fn environment_override() {
        std::env::set_var("FLOODLAB_DETECTION__CONSECUTIVE_BAD_THRESHOLD", "5");
        let config = FloodlabConfig::load().unwrap();
        assert_eq!(config.detection.consecutive_bad_threshold, 5);
        std::env::remove_var("FLOODLAB_DETECTION__CONSECUTIVE_BAD_THRESHOLD");
    }

    #[test]
    fn default_flags_match_single_ban_experiment() {
        let config = FloodlabConfig::default();
        assert!(!config.mitigation.threshold_block_enabled);
        assert!(!config.mitigation.rate_limit_enabled);
        assert!(config.mitigation.temp_ban_enabled);
    }
}
