//! Individual configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How phrases are windowed and how pedal points are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Condensed window lengths, one pass each, in order.
    /// Default: [3, 4]
    #[serde(default = "AnalysisConfig::default_window_lengths")]
    pub window_lengths: Vec<usize>,

    /// Figure that must appear where a pedal point resolves.
    /// Default: 5
    #[serde(default = "AnalysisConfig::default_pedal_end_figure")]
    pub pedal_end_figure: u8,

    /// Figure that must appear inside a pedal point.
    /// Default: 4
    #[serde(default = "AnalysisConfig::default_pedal_middle_figure")]
    pub pedal_middle_figure: u8,
}

impl AnalysisConfig {
    fn default_window_lengths() -> Vec<usize> {
        vec![3, 4]
    }

    fn default_pedal_end_figure() -> u8 {
        5
    }

    fn default_pedal_middle_figure() -> u8 {
        4
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_lengths: Self::default_window_lengths(),
            pedal_end_figure: Self::default_pedal_end_figure(),
            pedal_middle_figure: Self::default_pedal_middle_figure(),
        }
    }
}

/// Where the pattern table comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Custom table file; the built-in table when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive for tracing-subscriber.
    /// Default: warn
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "warn".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
