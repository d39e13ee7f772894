use rand::Rng;

use super::{DistrictTable, SCORE_CEILING};
use crate::config::{DashboardConfig, GenerationMode};
use crate::error::MetricsError;

/// Draws synthetic baseline and follow-up scores for every district in a
/// roster.
///
/// The random source is injected so callers decide between a seeded
/// `StdRng` (reproducible) and an entropy-seeded one.
pub struct DatasetGenerator<R: Rng> {
    config: DashboardConfig,
    rng: R,
}

impl<R: Rng> DatasetGenerator<R> {
    /// Validates `config` up front; a generator never holds a bad config.
    pub fn new(config: DashboardConfig, rng: R) -> Result<Self, MetricsError> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Produce a fresh table, one record per roster entry in roster order.
    /// Configs with fixed values yield the same table on every call.
    pub fn generate(&mut self) -> Result<DistrictTable, MetricsError> {
        let rows: Vec<(String, u32, u32)> = match &self.config.values {
            Some(values) => values
                .iter()
                .map(|v| (v.name.clone(), v.baseline, v.followup))
                .collect(),
            None => {
                let baseline = self.config.baseline;
                let followup_mode = self.config.followup;
                let rng = &mut self.rng;
                self.config
                    .districts
                    .iter()
                    .map(|name| {
                        let base = rng.gen_range(baseline.min..=baseline.max);
                        let followup = match followup_mode {
                            GenerationMode::Derived { delta } => {
                                let step = rng.gen_range(delta.min..=delta.max);
                                base.saturating_add(step).min(SCORE_CEILING)
                            }
                            GenerationMode::Independent { range } => {
                                rng.gen_range(range.min..=range.max)
                            }
                        };
                        (name.clone(), base, followup)
                    })
                    .collect()
            }
        };
        DistrictTable::from_values(rows)
    }
}
