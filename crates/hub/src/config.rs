//! Hub configuration

use anyhow::{bail, Context, Result};
use hub_lib::{
    classifier::{MissingTelemetryPolicy, DEFAULT_IDLE_THRESHOLD, DEFAULT_LOOKBACK_DAYS},
    detector::DetectorConfig,
    pricing::PricingConfig,
    report::AggregatorConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the optional config file
pub const CONFIG_FILE_ENV: &str = "HUB_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "finops-hub.toml";

/// Hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// HTTP port for the API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Collaborator snapshot document
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Price table file; built-in prices when absent
    #[serde(default)]
    pub pricing_path: Option<PathBuf>,

    #[serde(default = "default_idle_threshold")]
    pub idle_threshold: f64,

    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default)]
    pub missing_telemetry: MissingTelemetryPolicy,

    #[serde(default = "default_max_concurrent_zones")]
    pub max_concurrent_zones: usize,

    /// Deadline for one report in seconds, 0 disables it
    #[serde(default = "default_report_timeout")]
    pub report_timeout_secs: u64,
}

fn default_api_port() -> u16 {
    8080
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("snapshot.json")
}

fn default_idle_threshold() -> f64 {
    DEFAULT_IDLE_THRESHOLD
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_max_concurrent_zones() -> usize {
    4
}

fn default_report_timeout() -> u64 {
    30
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            snapshot_path: default_snapshot_path(),
            pricing_path: None,
            idle_threshold: default_idle_threshold(),
            lookback_days: default_lookback_days(),
            missing_telemetry: MissingTelemetryPolicy::default(),
            max_concurrent_zones: default_max_concurrent_zones(),
            report_timeout_secs: default_report_timeout(),
        }
    }
}

impl HubConfig {
    /// Load configuration from the optional config file and `HUB_*`
    /// environment variables (environment wins)
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&file))
    }

    pub fn load_from(file: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(config::Environment::with_prefix("HUB").try_parsing(true))
            .build()
            .context("Failed to read hub configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Invalid hub configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which idle classification means nothing
    pub fn validate(&self) -> Result<()> {
        if !self.idle_threshold.is_finite() || !(0.0..=1.0).contains(&self.idle_threshold) {
            bail!(
                "idle_threshold must be a utilization fraction in 0.0..=1.0, got {}",
                self.idle_threshold
            );
        }
        if self.lookback_days == 0 {
            bail!("lookback_days must be at least 1");
        }
        if self.max_concurrent_zones == 0 {
            bail!("max_concurrent_zones must be at least 1");
        }
        Ok(())
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            idle_threshold: self.idle_threshold,
            lookback_days: self.lookback_days,
            missing_telemetry: self.missing_telemetry,
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            max_concurrent_zones: self.max_concurrent_zones,
            timeout: (self.report_timeout_secs > 0)
                .then(|| Duration::from_secs(self.report_timeout_secs)),
        }
    }

    /// The configured price table, or the built-in one
    pub fn pricing(&self) -> Result<PricingConfig> {
        match &self.pricing_path {
            Some(path) => PricingConfig::load(path),
            None => Ok(PricingConfig::default()),
        }
    }

    /// Human-readable origin of the price table, for the startup log
    pub fn pricing_source(&self) -> String {
        self.pricing_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    }
}
