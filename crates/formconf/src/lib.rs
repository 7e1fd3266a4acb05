//! Configuration loading for the form-function labeler.
//!
//! Kept free of analysis types so the CLI decides how settings map onto the
//! engine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use formconf::FormConfig;
//!
//! let config = FormConfig::load().expect("Failed to load config");
//! println!("windows: {:?}", config.analysis.window_lengths);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/formfunction/config.toml` (system)
//! 2. `~/.config/formfunction/config.toml` (user)
//! 3. `./formfunction.toml` (local override, or `--config`)
//! 4. Environment variables (`FORMFUNCTION_*`)
//!
//! # Example Config
//!
//! ```toml
//! [analysis]
//! window_lengths = [3, 4]
//! pedal_end_figure = 5
//! pedal_middle_figure = 4
//!
//! [table]
//! path = "~/tables/caplin.toml"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{AnalysisConfig, TableConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Window lengths the pattern table has rows for.
pub const SUPPORTED_WINDOW_LENGTHS: [usize; 2] = [3, 4];

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete labeler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl FormConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/formfunction/config.toml`
    /// 3. `~/.config/formfunction/config.toml`
    /// 4. `./formfunction.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` replacing the local override.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    ///
    /// The merged result is validated before it is returned.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = FormConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;
        config.validate()?;

        Ok((config, sources))
    }

    /// Check values the loader cannot reject on type alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lengths = &self.analysis.window_lengths;
        if lengths.is_empty() {
            return Err(ConfigError::Invalid(
                "analysis.window_lengths must not be empty".into(),
            ));
        }
        if let Some(bad) = lengths
            .iter()
            .find(|n| !SUPPORTED_WINDOW_LENGTHS.contains(n))
        {
            return Err(ConfigError::Invalid(format!(
                "analysis.window_lengths: {} is not one of {:?}",
                bad, SUPPORTED_WINDOW_LENGTHS
            )));
        }
        for (name, figure) in [
            ("pedal_end_figure", self.analysis.pedal_end_figure),
            ("pedal_middle_figure", self.analysis.pedal_middle_figure),
        ] {
            if figure == 0 {
                return Err(ConfigError::Invalid(format!(
                    "analysis.{} must be a figured-bass number",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Form function labeler configuration\n\n");

        output.push_str("[analysis]\n");
        let lengths: Vec<String> = self
            .analysis
            .window_lengths
            .iter()
            .map(|n| n.to_string())
            .collect();
        output.push_str(&format!("window_lengths = [{}]\n", lengths.join(", ")));
        output.push_str(&format!(
            "pedal_end_figure = {}\n",
            self.analysis.pedal_end_figure
        ));
        output.push_str(&format!(
            "pedal_middle_figure = {}\n",
            self.analysis.pedal_middle_figure
        ));

        output.push_str("\n[table]\n");
        match &self.table.path {
            Some(path) => output.push_str(&format!("path = \"{}\"\n", path.display())),
            None => output.push_str("# path = \"table.toml\"  (built-in table when unset)\n"),
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output
    }
}
