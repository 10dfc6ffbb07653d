use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EditorialError, EditorialResult};

/// Root application configuration. Loaded from environment variables
/// with the prefix `EDITORIAL_EXPRESS__` and an optional TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub commit: CommitConfig,
}

// ─── Selection Config ───────────────────────────────────────────────────────

/// Filtering thresholds and scoring weights for the candidate selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
    /// Cool-down windows tried in order; the first is the nominal window.
    #[serde(default = "default_cooldown_tiers_days")]
    pub cooldown_tiers_days: Vec<u32>,
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f64,
    #[serde(default = "default_usage_weight")]
    pub usage_weight: f64,
    #[serde(default = "default_theme_weight")]
    pub theme_weight: f64,
    #[serde(default = "default_season_weight")]
    pub season_weight: f64,
    #[serde(default = "default_format_weight")]
    pub format_weight: f64,
    /// Runner-up candidates kept in each entry's rationale.
    #[serde(default = "default_alternatives")]
    pub alternatives: usize,
}

fn default_min_quality() -> u8 {
    7
}
fn default_cooldown_tiers_days() -> Vec<u32> {
    vec![30, 15, 0]
}
fn default_quality_weight() -> f64 {
    10.0
}
fn default_usage_weight() -> f64 {
    5.0
}
fn default_theme_weight() -> f64 {
    10.0
}
fn default_season_weight() -> f64 {
    2.0
}
fn default_format_weight() -> f64 {
    5.0
}
fn default_alternatives() -> usize {
    5
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_quality: default_min_quality(),
            cooldown_tiers_days: default_cooldown_tiers_days(),
            quality_weight: default_quality_weight(),
            usage_weight: default_usage_weight(),
            theme_weight: default_theme_weight(),
            season_weight: default_season_weight(),
            format_weight: default_format_weight(),
            alternatives: default_alternatives(),
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> EditorialResult<()> {
        if !(1..=10).contains(&self.min_quality) {
            return Err(EditorialError::config(format!(
                "min_quality must be within 1..=10, got {}",
                self.min_quality
            )));
        }
        if self.cooldown_tiers_days.is_empty() {
            return Err(EditorialError::config("cooldown_tiers_days must not be empty"));
        }
        if self
            .cooldown_tiers_days
            .windows(2)
            .any(|pair| pair[1] >= pair[0])
        {
            return Err(EditorialError::config(format!(
                "cooldown_tiers_days must be strictly decreasing, got {:?}",
                self.cooldown_tiers_days
            )));
        }
        let weights = [
            ("quality_weight", self.quality_weight),
            ("usage_weight", self.usage_weight),
            ("theme_weight", self.theme_weight),
            ("season_weight", self.season_weight),
            ("format_weight", self.format_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() {
                return Err(EditorialError::config(format!("{name} must be finite")));
            }
        }
        Ok(())
    }

    pub fn nominal_cooldown_days(&self) -> u32 {
        self.cooldown_tiers_days.first().copied().unwrap_or(0)
    }
}

// ─── Feedback Config ────────────────────────────────────────────────────────

/// How the trailing engagement average is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AveragingMethod {
    #[default]
    Mean,
    Median,
}

/// Which history the trailing average is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaselineScope {
    #[default]
    Tenant,
    Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default)]
    pub averaging: AveragingMethod,
    #[serde(default)]
    pub scope: BaselineScope,
    /// Used when no history falls inside the lookback window.
    #[serde(default)]
    pub baseline_engagement_rate: Option<f64>,
    #[serde(default = "default_positive_step")]
    pub positive_step: f64,
    #[serde(default = "default_negative_step")]
    pub negative_step: f64,
    #[serde(default = "default_min_adjustment")]
    pub min_adjustment: f64,
    #[serde(default = "default_max_adjustment")]
    pub max_adjustment: f64,
    #[serde(default = "default_weight_min")]
    pub weight_min: f64,
    #[serde(default = "default_weight_max")]
    pub weight_max: f64,
    #[serde(default = "default_max_engagement_rate")]
    pub max_engagement_rate: f64,
    #[serde(default = "default_max_store_retries")]
    pub max_store_retries: u32,
}

/// Ten years of history.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

fn default_lookback_days() -> u32 {
    30
}
fn default_positive_step() -> f64 {
    0.5
}
fn default_negative_step() -> f64 {
    0.2
}
fn default_min_adjustment() -> f64 {
    -1.0
}
fn default_max_adjustment() -> f64 {
    1.0
}
fn default_weight_min() -> f64 {
    -5.0
}
fn default_weight_max() -> f64 {
    5.0
}
fn default_max_engagement_rate() -> f64 {
    1.0
}
fn default_max_store_retries() -> u32 {
    3
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            averaging: AveragingMethod::default(),
            scope: BaselineScope::default(),
            baseline_engagement_rate: None,
            positive_step: default_positive_step(),
            negative_step: default_negative_step(),
            min_adjustment: default_min_adjustment(),
            max_adjustment: default_max_adjustment(),
            weight_min: default_weight_min(),
            weight_max: default_weight_max(),
            max_engagement_rate: default_max_engagement_rate(),
            max_store_retries: default_max_store_retries(),
        }
    }
}

impl FeedbackConfig {
    pub fn validate(&self) -> EditorialResult<()> {
        if self.lookback_days == 0 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(EditorialError::config(format!(
                "lookback_days must be in 1..={MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }
        if self.positive_step <= 0.0 || self.negative_step < 0.0 {
            return Err(EditorialError::config(
                "positive_step must be > 0 and negative_step >= 0",
            ));
        }
        if self.negative_step >= self.positive_step {
            return Err(EditorialError::config(format!(
                "negative_step ({}) must be smaller than positive_step ({})",
                self.negative_step, self.positive_step
            )));
        }
        if self.min_adjustment > 0.0 || self.max_adjustment < 0.0 {
            return Err(EditorialError::config(
                "adjustment bounds must satisfy min_adjustment <= 0 <= max_adjustment",
            ));
        }
        let applied_reward = self.positive_step.min(self.max_adjustment);
        let applied_penalty = self.negative_step.min(-self.min_adjustment);
        if applied_penalty >= applied_reward {
            return Err(EditorialError::config(format!(
                "applied penalty ({applied_penalty}) must be smaller than applied reward \
                 ({applied_reward}) once clamped to the adjustment bounds"
            )));
        }
        if self.weight_min > self.weight_max {
            return Err(EditorialError::config(format!(
                "weight_min ({}) exceeds weight_max ({})",
                self.weight_min, self.weight_max
            )));
        }
        if let Some(baseline) = self.baseline_engagement_rate {
            if !(0.0..=self.max_engagement_rate).contains(&baseline) {
                return Err(EditorialError::config(format!(
                    "baseline_engagement_rate {baseline} outside [0, {}]",
                    self.max_engagement_rate
                )));
            }
        }
        Ok(())
    }
}

// ─── Commit Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Commit attempts per entry before the slot is given up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_instance_id() -> String {
    "editorial-01".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instance_id: default_instance_id(),
            selection: SelectionConfig::default(),
            feedback: FeedbackConfig::default(),
            commit: CommitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> EditorialResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, overridden by environment variables.
    pub fn load_from(path: Option<&Path>) -> EditorialResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("EDITORIAL_EXPRESS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("selection.cooldown_tiers_days"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(instance_id = %config.instance_id, file = ?path, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> EditorialResult<()> {
        self.selection.validate()?;
        self.feedback.validate()?;
        if self.commit.max_attempts == 0 {
            return Err(EditorialError::config("commit.max_attempts must be positive"));
        }
        Ok(())
    }
}
