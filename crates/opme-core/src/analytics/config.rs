//! Analytics thresholds
//!
//! Every threshold the analytics use (trend slopes, z-score bands, alert
//! limits) comes from here rather than from literals, so a distributor with a
//! different revenue scale can tune them without a rebuild.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/opme/config/analytics.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Missing keys in an override fall back to the built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../../config/analytics.toml");

/// Slope thresholds for trend classification
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Absolute slope above which revenue/expense is growing (and below the
    /// negated value, declining)
    pub slope_threshold: f64,
    /// Same, for the net-flow (profitability) series
    pub profitability_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            slope_threshold: 1000.0,
            profitability_threshold: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeasonalityConfig {
    pub min_months: usize,
    /// Coefficient of variation (percent) above which income is seasonal
    pub cov_threshold: f64,
    /// Amplitude of the sinusoidal seasonality factor
    pub amplitude: f64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            min_months: 6,
            cov_threshold: 30.0,
            amplitude: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Trailing months averaged into the baseline
    pub baseline_months: usize,
    pub period_days: u32,
    /// Upper bound on projected periods regardless of the requested horizon
    pub max_periods: u32,
    pub initial_confidence: f64,
    pub confidence_step: f64,
    pub min_confidence: f64,
    /// Margin fraction at period 0; grows by `margin_step` per period
    pub base_margin: f64,
    pub margin_step: f64,
    pub max_accuracy: f64,
    pub min_accuracy: f64,
    pub base_accuracy: f64,
    pub accuracy_per_point: f64,
    pub max_variance_penalty: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            baseline_months: 3,
            period_days: 30,
            max_periods: 120,
            initial_confidence: 95.0,
            confidence_step: 5.0,
            min_confidence: 50.0,
            base_margin: 0.2,
            margin_step: 0.05,
            max_accuracy: 95.0,
            min_accuracy: 50.0,
            base_accuracy: 60.0,
            accuracy_per_point: 3.0,
            max_variance_penalty: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub min_months: usize,
    /// Trailing months evaluated for anomalies
    pub window_months: usize,
    pub z_threshold: f64,
    pub medium_z: f64,
    pub high_z: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_months: 3,
            window_months: 3,
            z_threshold: 2.0,
            medium_z: 2.5,
            high_z: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Overdue receivables total above which the alert is high severity
    pub overdue_high_amount: f64,
    pub upcoming_payables_days: i64,
    /// Forecast accuracy above which a confidence alert is emitted
    pub high_accuracy: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            overdue_high_amount: 50_000.0,
            upcoming_payables_days: 7,
            high_accuracy: 85.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// |variance %| at or below which a category is on track
    pub tolerance_percent: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            tolerance_percent: 10.0,
        }
    }
}

/// All analytics thresholds
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub trend: TrendConfig,
    pub seasonality: SeasonalityConfig,
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub alerts: AlertConfig,
    pub budget: BudgetConfig,
}

impl AnalyticsConfig {
    /// Load from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::parse(DEFAULT_CONFIG),
        }
    }

    /// Load from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: AnalyticsConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid analytics config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.forecast.period_days == 0 {
            return Err(Error::Config("forecast.period_days must be > 0".into()));
        }
        if self.forecast.baseline_months == 0 {
            return Err(Error::Config("forecast.baseline_months must be > 0".into()));
        }
        if !(self.anomaly.z_threshold <= self.anomaly.medium_z
            && self.anomaly.medium_z <= self.anomaly.high_z)
        {
            return Err(Error::Config(
                "anomaly thresholds must satisfy z_threshold <= medium_z <= high_z".into(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("opme").join("config").join("analytics.toml"))
}
