use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{ConsolidatorError, Result};

/// Share of offered volume assumed sold when a source carries no sold/unsold
/// detail. This is an approximation lifted from historical auction outcomes
/// and is surfaced in report metadata, never presented as measured.
pub const ASSUMED_SOLD_RATE: f64 = 0.87;

/// Policy for a (location, period) scope that yields zero canonical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReportPolicy {
    /// Write a zeroed placeholder report so the library still lists the scope.
    Emit,
    /// Write nothing for the scope.
    Skip,
}

impl Default for EmptyReportPolicy {
    fn default() -> Self {
        EmptyReportPolicy::Emit
    }
}

/// Pipeline configuration, loadable from TOML or assembled from CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Root of the collector staging tree: `<staging_root>/<location>/<doc>`.
    pub staging_root: PathBuf,
    /// Directory owned by the pipeline; reports and the library land here.
    pub output_root: PathBuf,
    #[serde(default)]
    pub empty_report_policy: EmptyReportPolicy,
    /// Quality strategy id; `standard_v1` unless overridden.
    #[serde(default = "default_quality_strategy")]
    pub quality_strategy: String,
}

fn default_quality_strategy() -> String {
    "standard_v1".to_string()
}

impl PipelineConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConsolidatorError::Config(format!("Failed to read config file '{path}': {e}"))
        })?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Explicit context threaded through every pipeline component in place of
/// ambient globals: configuration plus the clock.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub clock: Arc<dyn Clock>,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }
}
