use chrono::{DateTime, TimeZone, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Every tuned constant of the rating, pairing and handicap engine.
///
/// The league has historically run with more than one constant set; this
/// struct is the single consolidated set, labelled by `version`. Tests and
/// deployments override individual fields instead of editing algorithm code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: String,
    pub form: FormConfig,
    pub synergy: SynergyConfig,
    pub cost: PairCostConfig,
    pub pairing: PairingConfig,
    pub matchup: MatchupConfig,
    pub handicap: HandicapConfig,
    pub history: HistoryConfig,
    /// Seed for the pairing swap refinement. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "v2".to_string(),
            form: FormConfig::default(),
            synergy: SynergyConfig::default(),
            cost: PairCostConfig::default(),
            pairing: PairingConfig::default(),
            matchup: MatchupConfig::default(),
            handicap: HandicapConfig::default(),
            history: HistoryConfig::default(),
            rng_seed: None,
        }
    }
}

/// Ten years; longer head-to-head windows are a configuration mistake
const MAX_HEAD_TO_HEAD_DAYS: i64 = 3650;

impl EngineConfig {
    /// Reject values that would make the formulas divide by zero or misbehave
    pub fn validate(&self) -> Result<(), String> {
        let f = &self.form;
        if f.window_size == 0 {
            return Err("form.window_size must be at least 1".to_string());
        }
        for (name, value) in [
            ("form.margin_points_scale", f.margin_points_scale),
            ("form.margin_cap", f.margin_cap),
            ("form.upset_scale", f.upset_scale),
            ("form.upset_cap", f.upset_cap),
            ("form.prior_games", f.prior_games),
            ("matchup.gap_scale", self.matchup.gap_scale),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        if f.form_max < 0.0 {
            return Err("form.form_max must not be negative".to_string());
        }
        let s = &self.synergy;
        if !(s.prob_floor > 0.0 && s.prob_floor < s.prob_ceiling && s.prob_ceiling < 1.0) {
            return Err("synergy probability bounds must satisfy 0 < floor < ceiling < 1".to_string());
        }
        let h = &self.handicap;
        if h.max_points == 0 {
            return Err("handicap.max_points must be at least 1".to_string());
        }
        if !(0..=MAX_HEAD_TO_HEAD_DAYS).contains(&h.head_to_head_days) {
            return Err(format!(
                "handicap.head_to_head_days must be within 0..={}, got {}",
                MAX_HEAD_TO_HEAD_DAYS, h.head_to_head_days
            ));
        }
        if h.equal_strength_epsilon.is_nan() || h.equal_strength_epsilon < 0.0 {
            return Err("handicap.equal_strength_epsilon must not be negative".to_string());
        }
        if h.rating_tiers.iter().any(|t| !t.above.is_finite()) {
            return Err("handicap.rating_tiers thresholds must be finite".to_string());
        }
        if self.matchup.quality_scale.is_nan() || self.matchup.quality_scale <= 0.0 {
            return Err("matchup.quality_scale must be positive".to_string());
        }
        Ok(())
    }
}

/// Form engine constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub window_size: usize,
    pub default_base_rating: f64,
    /// Source ratings above this belong to an incompatible legacy scale
    pub legacy_scale_ceiling: f64,
    pub prior_wins: f64,
    pub prior_games: f64,
    pub margin_points_scale: f64,
    pub margin_cap: f64,
    pub upset_scale: f64,
    pub upset_cap: f64,
    pub win_weight: f64,
    pub margin_weight: f64,
    pub upset_weight: f64,
    pub form_scale: f64,
    pub form_max: f64,
    pub zero_snap: f64,
    /// Matches on or after this instant carry trustworthy score margins
    pub score_aware_cutover: DateTime<Utc>,
    /// Flat margin ratio used for matches before the cutover
    pub legacy_margin_ratio: f64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            default_base_rating: 3.0,
            legacy_scale_ceiling: 20.0,
            prior_wins: 2.0,
            prior_games: 4.0,
            margin_points_scale: 11.0,
            margin_cap: 0.60,
            upset_scale: 1.2,
            upset_cap: 0.30,
            win_weight: 0.80,
            margin_weight: 0.15,
            upset_weight: 0.05,
            form_scale: 0.20,
            form_max: 0.30,
            zero_snap: 0.005,
            score_aware_cutover: default_cutover(),
            legacy_margin_ratio: 0.5,
        }
    }
}

fn default_cutover() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Synergy engine constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynergyConfig {
    pub shrink_games: f64,
    pub prob_floor: f64,
    pub prob_ceiling: f64,
    pub quality_base: f64,
    pub quality_span: f64,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            shrink_games: 6.0,
            prob_floor: 0.01,
            prob_ceiling: 0.99,
            quality_base: 0.75,
            quality_span: 0.50,
        }
    }
}

/// Teammate cost constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairCostConfig {
    pub target_diff: f64,
    pub similar_gap: f64,
    pub similar_penalty: f64,
    pub extreme_gap: f64,
    pub extreme_penalty: f64,
    pub support_cutoff: f64,
    pub two_supports_penalty: f64,
    pub synergy_threshold: f64,
    pub synergy_weight: f64,
    pub repeat_pair_penalty: f64,
}

impl Default for PairCostConfig {
    fn default() -> Self {
        Self {
            target_diff: 1.4,
            similar_gap: 0.6,
            similar_penalty: 1.5,
            extreme_gap: 2.0,
            extreme_penalty: 3.0,
            support_cutoff: 2.6,
            two_supports_penalty: 10.0,
            synergy_threshold: 0.35,
            synergy_weight: 2.0,
            repeat_pair_penalty: 15.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    pub swap_iterations: usize,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self { swap_iterations: 200 }
    }
}

/// Team-vs-team cost constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchupConfig {
    pub structure_weight: f64,
    pub gap_weight: f64,
    pub gap_scale: f64,
    pub repeat_matchup_penalty: f64,
    /// Weight of a searched candidate pair's own teammate cost
    pub candidate_pair_weight: f64,
    pub result_limit: usize,
    /// Quality of a perfectly even matchup
    pub quality_scale: f64,
    /// Quality lost per point of strength gap in outcome predictions
    pub predict_quality_slope: f64,
}

impl Default for MatchupConfig {
    fn default() -> Self {
        Self {
            structure_weight: 0.7,
            gap_weight: 0.6,
            gap_scale: 2.0,
            repeat_matchup_penalty: 50.0,
            candidate_pair_weight: 0.5,
            result_limit: 10,
            quality_scale: 100.0,
            predict_quality_slope: 50.0,
        }
    }
}

/// A strength gap strictly above `above` earns `points`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatingTier {
    pub above: f64,
    pub points: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandicapConfig {
    /// The highest tier the gap exceeds wins, whatever the listed order
    pub rating_tiers: Vec<RatingTier>,
    /// Strength gaps below this count as equal teams
    pub equal_strength_epsilon: f64,
    pub support_cutoff: f64,
    pub support_points: f64,
    pub form_minor_gap: f64,
    pub form_minor_points: f64,
    pub form_major_gap: f64,
    pub form_major_points: f64,
    pub blowout_threshold: f64,
    pub blowout_points: f64,
    pub head_to_head_days: i64,
    pub head_to_head_single: f64,
    pub head_to_head_multiple: f64,
    pub max_points: u8,
}

impl Default for HandicapConfig {
    fn default() -> Self {
        Self {
            rating_tiers: vec![
                RatingTier { above: 1.2, points: 4.0 },
                RatingTier { above: 0.9, points: 3.0 },
                RatingTier { above: 0.6, points: 2.0 },
                RatingTier { above: 0.3, points: 1.0 },
            ],
            equal_strength_epsilon: 1e-9,
            support_cutoff: 2.6,
            support_points: 1.0,
            form_minor_gap: 0.20,
            form_minor_points: 1.0,
            form_major_gap: 0.30,
            form_major_points: 2.0,
            blowout_threshold: 0.35,
            blowout_points: 1.0,
            head_to_head_days: 30,
            head_to_head_single: 0.5,
            head_to_head_multiple: 1.0,
            max_points: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub balanced_threshold: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { balanced_threshold: 0.25 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with MATCHMAKER__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MATCHMAKER__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("MATCHMAKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .build()?;

        settings.try_deserialize::<Self>()?.checked()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MATCHMAKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize::<Self>()?.checked()
    }

    fn checked(self) -> Result<Self, ConfigError> {
        self.engine.validate().map_err(ConfigError::Message)?;
        Ok(self)
    }
}
