//! Config file discovery, loading, and environment variable overlay.

use crate::{AnalysisConfig, ConfigError, FormConfig, TableConfig, TelemetryConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/formfunction/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("formfunction/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("formfunction.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<FormConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from a TOML string.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<FormConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut config = FormConfig::default();

    if let Some(analysis) = table.get("analysis").and_then(|v| v.as_table()) {
        if let Some(lengths) = analysis.get("window_lengths").and_then(|v| v.as_array()) {
            config.analysis.window_lengths = lengths
                .iter()
                .map(|v| {
                    v.as_integer()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| ConfigError::Parse {
                            path: path.to_path_buf(),
                            message: format!(
                                "analysis.window_lengths: {} is not a window length",
                                v
                            ),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
        }
        if let Some(v) = analysis.get("pedal_end_figure").and_then(|v| v.as_integer()) {
            config.analysis.pedal_end_figure = figure(v, path)?;
        }
        if let Some(v) = analysis.get("pedal_middle_figure").and_then(|v| v.as_integer()) {
            config.analysis.pedal_middle_figure = figure(v, path)?;
        }
    }

    if let Some(t) = table.get("table").and_then(|v| v.as_table()) {
        if let Some(v) = t.get("path").and_then(|v| v.as_str()) {
            config.table.path = Some(expand_path(v));
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(config)
}

fn figure(value: i64, path: &Path) -> Result<u8, ConfigError> {
    u8::try_from(value).map_err(|_| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("figure {} out of range", value),
    })
}

/// Merge two configs, with non-default `overlay` values taking precedence.
pub fn merge_configs(base: FormConfig, overlay: FormConfig) -> FormConfig {
    let analysis_default = AnalysisConfig::default();

    FormConfig {
        analysis: AnalysisConfig {
            window_lengths: if overlay.analysis.window_lengths != analysis_default.window_lengths {
                overlay.analysis.window_lengths
            } else {
                base.analysis.window_lengths
            },
            pedal_end_figure: if overlay.analysis.pedal_end_figure
                != analysis_default.pedal_end_figure
            {
                overlay.analysis.pedal_end_figure
            } else {
                base.analysis.pedal_end_figure
            },
            pedal_middle_figure: if overlay.analysis.pedal_middle_figure
                != analysis_default.pedal_middle_figure
            {
                overlay.analysis.pedal_middle_figure
            } else {
                base.analysis.pedal_middle_figure
            },
        },
        table: TableConfig {
            path: overlay.table.path.or(base.table.path),
        },
        telemetry: TelemetryConfig {
            log_level: if overlay.telemetry.log_level != TelemetryConfig::default().log_level {
                overlay.telemetry.log_level
            } else {
                base.telemetry.log_level
            },
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut FormConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |key| env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup.
///
/// A `FORMFUNCTION_WINDOWS` value that is not a comma list of numbers is
/// an error rather than being skipped.
pub fn apply_overrides_from<F>(
    config: &mut FormConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("FORMFUNCTION_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("FORMFUNCTION_LOG_LEVEL".to_string());
    }

    if let Some(v) = lookup("FORMFUNCTION_WINDOWS") {
        let lengths = v
            .split(',')
            .map(|s| s.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                ConfigError::Invalid(format!("FORMFUNCTION_WINDOWS='{}': {}", v, e))
            })?;
        config.analysis.window_lengths = lengths;
        sources.env_overrides.push("FORMFUNCTION_WINDOWS".to_string());
    }

    if let Some(v) = lookup("FORMFUNCTION_TABLE") {
        config.table.path = Some(expand_path(&v));
        sources.env_overrides.push("FORMFUNCTION_TABLE".to_string());
    }

    Ok(())
}

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
