use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::rosters::{LIMA_CORE, LIMA_EXTENDED};
use crate::dataset::SCORE_CEILING;
use crate::error::MetricsError;

// ── Ranges and generation mode ─────────────────────────────────────

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: u32,
    pub max: u32,
}

impl ValueRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Score ranges must lie within `1..=SCORE_CEILING`.
    fn validate_score(&self, label: &str) -> Result<(), MetricsError> {
        if self.min == 0 {
            return Err(MetricsError::InvalidConfig(format!(
                "{} range must be positive (got min {})",
                label, self.min
            )));
        }
        if self.max > SCORE_CEILING {
            return Err(MetricsError::InvalidConfig(format!(
                "{} range exceeds {} (got max {})",
                label, SCORE_CEILING, self.max
            )));
        }
        self.validate_order(label)
    }

    fn validate_order(&self, label: &str) -> Result<(), MetricsError> {
        if self.min > self.max {
            return Err(MetricsError::InvalidConfig(format!(
                "{} range has min {} > max {}",
                label, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// How the follow-up value of a district is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerationMode {
    /// Baseline plus a random delta, capped at the score ceiling.
    Derived { delta: ValueRange },
    /// Drawn on its own, unrelated to the baseline.
    Independent { range: ValueRange },
}

/// Recorded scores for one district, used instead of drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictValues {
    pub name: String,
    pub baseline: u32,
    pub followup: u32,
}

// ── Dashboard config ───────────────────────────────────────────────

fn default_periods() -> [String; 2] {
    ["2024".to_string(), "2025".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub title: String,
    /// What is being measured, e.g. "technology" or "security".
    pub metric: String,
    /// Labels for the baseline and follow-up periods.
    #[serde(default = "default_periods")]
    pub periods: [String; 2],
    pub districts: Vec<String>,
    pub baseline: ValueRange,
    pub followup: GenerationMode,
    /// Fixed scores in roster order. When set, tables are built from these
    /// rows and the ranges are not drawn from. Baselines may be zero here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<DistrictValues>>,
}

/// Names accepted by [`DashboardConfig::preset`].
pub const PRESET_NAMES: [&str; 3] = ["technology", "technology-extended", "security"];

impl DashboardConfig {
    /// Built-in dashboards.
    pub fn preset(name: &str) -> Result<Self, MetricsError> {
        let tech_followup = GenerationMode::Derived {
            delta: ValueRange::new(5, 25),
        };

        let config = match name {
            "technology" => DashboardConfig {
                title: "Monitoreo del Uso de Tecnología en Lima Metropolitana".to_string(),
                metric: "technology".to_string(),
                periods: default_periods(),
                districts: roster(&LIMA_CORE),
                baseline: ValueRange::new(30, 80),
                followup: tech_followup,
                values: None,
            },
            "technology-extended" => DashboardConfig {
                title: "Monitoreo del Uso de Tecnología en Lima Metropolitana".to_string(),
                metric: "technology".to_string(),
                periods: default_periods(),
                districts: roster(&LIMA_EXTENDED),
                baseline: ValueRange::new(30, 80),
                followup: tech_followup,
                values: None,
            },
            "security" => DashboardConfig {
                title: "Monitoreo de Seguridad en Lima Metropolitana".to_string(),
                metric: "security".to_string(),
                periods: default_periods(),
                districts: roster(&LIMA_EXTENDED),
                baseline: ValueRange::new(40, 80),
                followup: GenerationMode::Independent {
                    range: ValueRange::new(50, 95),
                },
                values: None,
            },
            other => {
                return Err(MetricsError::InvalidConfig(format!(
                    "unknown preset '{}' (expected one of {:?})",
                    other, PRESET_NAMES
                )))
            }
        };
        Ok(config)
    }

    /// Check roster and ranges. Called before any generator is built.
    pub fn validate(&self) -> Result<(), MetricsError> {
        validate_roster(self.districts.iter().map(String::as_str))?;
        self.baseline.validate_score("baseline")?;
        match &self.followup {
            GenerationMode::Derived { delta } => delta.validate_order("delta")?,
            GenerationMode::Independent { range } => range.validate_score("follow-up")?,
        }
        if let Some(values) = &self.values {
            self.validate_values(values)?;
        }
        Ok(())
    }

    fn validate_values(&self, values: &[DistrictValues]) -> Result<(), MetricsError> {
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        let roster: Vec<&str> = self.districts.iter().map(String::as_str).collect();
        if names != roster {
            return Err(MetricsError::InvalidConfig(
                "fixed values must list the roster districts in order".to_string(),
            ));
        }
        for v in values {
            if v.baseline > SCORE_CEILING || v.followup > SCORE_CEILING {
                return Err(MetricsError::InvalidConfig(format!(
                    "values for '{}' exceed {}",
                    v.name, SCORE_CEILING
                )));
            }
        }
        Ok(())
    }

    /// Load and validate a config from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, MetricsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| MetricsError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: DashboardConfig =
            serde_json::from_str(&contents).map_err(|e| MetricsError::ConfigLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        info!(
            "Loaded dashboard config '{}' with {} districts from {}",
            config.title,
            config.districts.len(),
            path.display()
        );
        Ok(config)
    }

    /// Pick the active config: explicit path, then the user config dir,
    /// then a named preset.
    pub fn resolve(settings: &ServerSettings) -> Result<Self, MetricsError> {
        if let Some(path) = &settings.config_path {
            return Self::load_from_file(path);
        }

        if let Some(path) = user_config_path() {
            if path.is_file() {
                return Self::load_from_file(&path);
            }
        }

        let config = Self::preset(&settings.preset)?;
        config.validate()?;
        info!(
            "Using preset '{}' with {} districts",
            settings.preset,
            config.districts.len()
        );
        Ok(config)
    }
}

fn roster(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Non-empty, no blank or padded names, no duplicates.
pub fn validate_roster<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<(), MetricsError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(MetricsError::InvalidConfig(
                "district names must not be blank".to_string(),
            ));
        }
        if name.trim() != name {
            return Err(MetricsError::InvalidConfig(format!(
                "district name '{}' has leading or trailing whitespace",
                name
            )));
        }
        if !seen.insert(name) {
            return Err(MetricsError::DuplicateDistrict(name.to_string()));
        }
    }
    if seen.is_empty() {
        return Err(MetricsError::InvalidConfig(
            "district roster is empty".to_string(),
        ));
    }
    Ok(())
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("district-metrics").join("dashboard.json"))
}

// ── Server settings ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub ws_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub config_path: Option<PathBuf>,
    pub preset: String,
    /// Base seed for session RNGs. `None` means seed from entropy.
    pub seed: Option<u64>,
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            ws_addr: SocketAddr::from(([127, 0, 0, 1], 9001)),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 9002)),
            config_path: None,
            preset: "technology".to_string(),
            seed: None,
            max_sessions: 256,
        }
    }
}

impl ServerSettings {
    /// Read settings from `DISTRICT_METRICS_*` environment variables.
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            ws_addr: parse_or("DISTRICT_METRICS_ADDR", &lookup, defaults.ws_addr),
            http_addr: parse_or("DISTRICT_METRICS_HTTP_ADDR", &lookup, defaults.http_addr),
            config_path: lookup("DISTRICT_METRICS_CONFIG").map(PathBuf::from),
            preset: lookup("DISTRICT_METRICS_PRESET").unwrap_or(defaults.preset),
            seed: lookup("DISTRICT_METRICS_SEED").and_then(|raw| match raw.parse() {
                Ok(seed) => Some(seed),
                Err(e) => {
                    warn!("Ignoring DISTRICT_METRICS_SEED={:?}: {}", raw, e);
                    None
                }
            }),
            max_sessions: parse_or(
                "DISTRICT_METRICS_MAX_SESSIONS",
                &lookup,
                defaults.max_sessions,
            )
            .max(1),
        }
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring {}={:?}: {}", key, raw, e);
                default
            }
        },
    }
}
