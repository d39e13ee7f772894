pub mod generator;
pub mod metrics;
pub mod rosters;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::validate_roster;
use crate::error::MetricsError;

/// Upper bound of every score.
pub const SCORE_CEILING: u32 = 100;

// ── Records ────────────────────────────────────────────────────────

/// One district's baseline and follow-up scores with the derived change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictRecord {
    pub name: String,
    pub baseline_value: u32,
    pub followup_value: u32,
    pub absolute_change: i64,
    pub relative_change_pct: f64,
    /// Set when `baseline_value == 0` and the relative change was forced to `0.0`.
    pub zero_baseline: bool,
}

impl DistrictRecord {
    /// Follow-up score as a fraction of the ceiling, for progress bars.
    pub fn progress(&self) -> f64 {
        self.followup_value as f64 / SCORE_CEILING as f64
    }
}

// ── Sorting ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    BaselineValue,
    FollowupValue,
    AbsoluteChange,
    #[default]
    RelativeChangePct,
}

impl SortField {
    /// Sortable columns in table order.
    pub const ALL: [SortField; 4] = [
        SortField::BaselineValue,
        SortField::FollowupValue,
        SortField::AbsoluteChange,
        SortField::RelativeChangePct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::BaselineValue => "baseline_value",
            SortField::FollowupValue => "followup_value",
            SortField::AbsoluteChange => "absolute_change",
            SortField::RelativeChangePct => "relative_change_pct",
        }
    }

    fn compare(&self, a: &DistrictRecord, b: &DistrictRecord) -> Ordering {
        match self {
            SortField::BaselineValue => a.baseline_value.cmp(&b.baseline_value),
            SortField::FollowupValue => a.followup_value.cmp(&b.followup_value),
            SortField::AbsoluteChange => a.absolute_change.cmp(&b.absolute_change),
            SortField::RelativeChangePct => a.relative_change_pct.total_cmp(&b.relative_change_pct),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| MetricsError::UnknownSortField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// The sort choices a table view offers, with the default preselected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOptions {
    pub fields: Vec<String>,
    pub default_index: usize,
    pub default_direction: SortDirection,
}

pub fn sort_options() -> SortOptions {
    let fields: Vec<String> = SortField::ALL.iter().map(|f| f.as_str().to_string()).collect();
    let default_index = SortField::ALL
        .iter()
        .position(|f| *f == SortField::default())
        .unwrap_or(0);
    SortOptions {
        fields,
        default_index,
        default_direction: SortDirection::default(),
    }
}

// ── Aggregates ─────────────────────────────────────────────────────

/// Table-wide averages shown above the per-district views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub district_count: usize,
    pub mean_baseline: f64,
    pub mean_followup: f64,
    pub mean_relative_change_pct: f64,
}

impl SummaryStats {
    pub fn baseline_progress(&self) -> f64 {
        self.mean_baseline / SCORE_CEILING as f64
    }

    pub fn followup_progress(&self) -> f64 {
        self.mean_followup / SCORE_CEILING as f64
    }
}

/// One bar group of the baseline vs follow-up comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub name: String,
    pub baseline_value: u32,
    pub followup_value: u32,
}

// ── Table ──────────────────────────────────────────────────────────

/// District records in roster order. Names are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTable {
    records: Vec<DistrictRecord>,
}

impl DistrictTable {
    /// Build a table from `(name, baseline, followup)` rows, deriving the
    /// change columns. Fails on an empty roster or duplicate names.
    pub fn from_values<S: Into<String>>(
        rows: impl IntoIterator<Item = (S, u32, u32)>,
    ) -> Result<Self, MetricsError> {
        let records: Vec<DistrictRecord> = rows
            .into_iter()
            .map(|(name, baseline, followup)| metrics::derive_record(name, baseline, followup))
            .collect();
        validate_roster(records.iter().map(|r| r.name.as_str()))?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[DistrictRecord] {
        &self.records
    }

    /// Re-derive the change columns of every record.
    pub fn recompute(&mut self) {
        for record in &mut self.records {
            metrics::recompute_record(record);
        }
    }

    /// Look up a district by exact name.
    pub fn select(&self, name: &str) -> Result<&DistrictRecord, MetricsError> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| MetricsError::SelectionNotFound(name.to_string()))
    }

    /// Records reordered by `field`. The sort is stable in both directions,
    /// so tied records keep roster order.
    pub fn sorted(&self, field: SortField, direction: SortDirection) -> Vec<DistrictRecord> {
        let mut rows = self.records.clone();
        match direction {
            SortDirection::Ascending => rows.sort_by(|a, b| field.compare(a, b)),
            SortDirection::Descending => rows.sort_by(|a, b| field.compare(b, a)),
        }
        rows
    }

    pub fn summary(&self) -> SummaryStats {
        let n = self.records.len();
        let mean = |f: fn(&DistrictRecord) -> f64| -> f64 {
            if n == 0 {
                0.0
            } else {
                self.records.iter().map(f).sum::<f64>() / n as f64
            }
        };
        SummaryStats {
            district_count: n,
            mean_baseline: mean(|r| r.baseline_value as f64),
            mean_followup: mean(|r| r.followup_value as f64),
            mean_relative_change_pct: mean(|r| r.relative_change_pct),
        }
    }

    /// Comparison chart feed, highest follow-up first.
    pub fn comparison_series(&self) -> Vec<ChartRow> {
        self.sorted(SortField::FollowupValue, SortDirection::Descending)
            .into_iter()
            .map(|r| ChartRow {
                name: r.name,
                baseline_value: r.baseline_value,
                followup_value: r.followup_value,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DistrictTable {
        DistrictTable::from_values([
            ("Ate", 50, 70),
            ("Comas", 40, 44),
            ("Lince", 60, 70),
            ("Breña", 30, 45),
            ("Callao", 50, 60),
        ])
        .unwrap()
    }

    fn names(rows: &[DistrictRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn two_district_scenario() {
        let table = DistrictTable::from_values([("A", 50, 70), ("B", 0, 10)]).unwrap();
        let a = table.select("A").unwrap();
        assert_eq!(a.absolute_change, 20);
        assert_eq!(a.relative_change_pct, 40.0);
        let b = table.select("B").unwrap();
        assert_eq!(b.absolute_change, 10);
        assert_eq!(b.relative_change_pct, 0.0);
        assert!(b.zero_baseline);
    }

    #[test]
    fn preserves_roster_order() {
        let table = sample();
        assert_eq!(
            names(table.records()),
            vec!["Ate", "Comas", "Lince", "Breña", "Callao"]
        );
    }

    #[test]
    fn duplicate_rows_rejected() {
        let result = DistrictTable::from_values([("Ate", 50, 70), ("Ate", 40, 50)]);
        assert_eq!(result, Err(MetricsError::DuplicateDistrict("Ate".to_string())));
    }

    #[test]
    fn empty_rows_rejected() {
        let rows: Vec<(String, u32, u32)> = Vec::new();
        assert!(matches!(
            DistrictTable::from_values(rows),
            Err(MetricsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn select_missing_is_not_found() {
        let table = sample();
        assert_eq!(
            table.select("Miraflores"),
            Err(MetricsError::SelectionNotFound("Miraflores".to_string()))
        );
    }

    #[test]
    fn sort_by_relative_change() {
        let table = sample();
        // Ate 40.0, Comas 10.0, Lince 16.7, Breña 50.0, Callao 20.0
        let asc = table.sorted(SortField::RelativeChangePct, SortDirection::Ascending);
        assert_eq!(names(&asc), vec!["Comas", "Lince", "Callao", "Ate", "Breña"]);
    }

    #[test]
    fn descending_reverses_ascending_without_ties() {
        let table = sample();
        let asc = table.sorted(SortField::RelativeChangePct, SortDirection::Ascending);
        let mut desc = table.sorted(SortField::RelativeChangePct, SortDirection::Descending);
        desc.reverse();
        assert_eq!(asc, desc);
    }

    fn key(field: SortField, r: &DistrictRecord) -> f64 {
        match field {
            SortField::BaselineValue => r.baseline_value as f64,
            SortField::FollowupValue => r.followup_value as f64,
            SortField::AbsoluteChange => r.absolute_change as f64,
            SortField::RelativeChangePct => r.relative_change_pct,
        }
    }

    #[test]
    fn descending_keys_mirror_ascending_on_generated_tables() {
        use crate::config::DashboardConfig;
        use crate::dataset::generator::DatasetGenerator;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        for name in ["technology-extended", "security"] {
            let config = DashboardConfig::preset(name).unwrap();
            for seed in 0..25u64 {
                let rng = StdRng::seed_from_u64(seed);
                let table = DatasetGenerator::new(config.clone(), rng)
                    .unwrap()
                    .generate()
                    .unwrap();
                for field in SortField::ALL {
                    let asc = table.sorted(field, SortDirection::Ascending);
                    let desc = table.sorted(field, SortDirection::Descending);
                    let asc_keys: Vec<f64> = asc.iter().map(|r| key(field, r)).collect();
                    let mut desc_keys: Vec<f64> = desc.iter().map(|r| key(field, r)).collect();
                    desc_keys.reverse();
                    assert_eq!(asc_keys, desc_keys, "{} seed {} by {}", name, seed, field);
                    for pair in asc_keys.windows(2) {
                        assert!(pair[0] <= pair[1]);
                    }
                    assert_eq!(asc, table.sorted(field, SortDirection::Ascending));
                    assert_eq!(desc, table.sorted(field, SortDirection::Descending));
                }
            }
        }
    }

    #[test]
    fn ties_keep_roster_order_both_ways() {
        let table = sample();
        // Ate and Lince tie on follow-up (70); Ate comes first in the roster.
        let asc = table.sorted(SortField::FollowupValue, SortDirection::Ascending);
        assert_eq!(names(&asc), vec!["Comas", "Breña", "Callao", "Ate", "Lince"]);
        let desc = table.sorted(SortField::FollowupValue, SortDirection::Descending);
        assert_eq!(names(&desc), vec!["Ate", "Lince", "Callao", "Breña", "Comas"]);
    }

    #[test]
    fn repeated_sort_is_stable() {
        let table = sample();
        let first = table.sorted(SortField::BaselineValue, SortDirection::Descending);
        let second = table.sorted(SortField::BaselineValue, SortDirection::Descending);
        assert_eq!(first, second);
    }

    #[test]
    fn sort_field_parsing() {
        assert_eq!(
            "absolute_change".parse::<SortField>(),
            Ok(SortField::AbsoluteChange)
        );
        assert_eq!(
            "name".parse::<SortField>(),
            Err(MetricsError::UnknownSortField("name".to_string()))
        );
        for field in SortField::ALL {
            assert_eq!(field.to_string().parse::<SortField>(), Ok(field));
        }
    }

    #[test]
    fn default_sort_option_is_relative_change() {
        let options = sort_options();
        assert_eq!(options.fields.len(), 4);
        assert_eq!(options.fields[options.default_index], "relative_change_pct");
        assert_eq!(options.default_direction, SortDirection::Ascending);
    }

    #[test]
    fn summary_means() {
        let table = DistrictTable::from_values([("A", 50, 70), ("B", 30, 30)]).unwrap();
        let summary = table.summary();
        assert_eq!(summary.district_count, 2);
        assert_eq!(summary.mean_baseline, 40.0);
        assert_eq!(summary.mean_followup, 50.0);
        assert_eq!(summary.mean_relative_change_pct, 20.0);
        assert_eq!(summary.followup_progress(), 0.5);
        assert_eq!(summary.baseline_progress(), 0.4);
    }

    #[test]
    fn comparison_series_highest_first() {
        let series = sample().comparison_series();
        let order: Vec<&str> = series.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["Ate", "Lince", "Callao", "Breña", "Comas"]);
        assert_eq!(series[0].baseline_value, 50);
    }

    #[test]
    fn progress_is_fraction_of_ceiling() {
        let table = sample();
        assert_eq!(table.select("Comas").unwrap().progress(), 0.44);
    }
}
