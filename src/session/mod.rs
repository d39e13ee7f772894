pub mod manager;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::DashboardConfig;
use crate::dataset::generator::DatasetGenerator;
use crate::dataset::{
    sort_options, ChartRow, DistrictRecord, DistrictTable, SortDirection, SortField, SummaryStats,
};
use crate::error::MetricsError;
use crate::protocol::TableSnapshot;

pub type SessionId = u64;

/// One client's dashboard: a table generated once and kept until the
/// client asks for a new draw.
pub struct DashboardSession {
    pub id: SessionId,
    generator: DatasetGenerator<StdRng>,
    table: DistrictTable,
    /// Bumped on every regenerate.
    generation: u32,
    sort_field: SortField,
    sort_direction: SortDirection,
    /// Manager clock value at the last access, for eviction.
    pub(crate) last_touch: u64,
    /// Live connections using this session. Attached sessions are never evicted.
    pub(crate) attached: u32,
}

/// Mix a base seed with a session id so sessions sharing a base seed draw
/// different but reproducible tables.
pub fn session_seed(base: u64, id: SessionId) -> u64 {
    base.wrapping_mul(83492791).wrapping_add(id.wrapping_mul(73856093))
}

impl DashboardSession {
    pub fn new(
        id: SessionId,
        config: DashboardConfig,
        seed: Option<u64>,
    ) -> Result<Self, MetricsError> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(session_seed(seed, id)),
            None => StdRng::from_entropy(),
        };
        let mut generator = DatasetGenerator::new(config, rng)?;
        let table = generator.generate()?;
        Ok(Self {
            id,
            generator,
            table,
            generation: 0,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            last_touch: 0,
            attached: 0,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        self.generator.config()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn table(&self) -> &DistrictTable {
        &self.table
    }

    /// Current table, ordered by the session's sort choice.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            session_id: self.id,
            generation: self.generation,
            sort_field: self.sort_field,
            sort_direction: self.sort_direction,
            sort_options: sort_options(),
            records: self.table.sorted(self.sort_field, self.sort_direction),
        }
    }

    pub fn set_sort(&mut self, field: SortField, direction: SortDirection) {
        self.sort_field = field;
        self.sort_direction = direction;
    }

    pub fn select(&self, name: &str) -> Result<&DistrictRecord, MetricsError> {
        self.table.select(name)
    }

    pub fn summary(&self) -> SummaryStats {
        self.table.summary()
    }

    pub fn chart(&self) -> Vec<ChartRow> {
        self.table.comparison_series()
    }

    /// Draw a new table from this session's RNG. The sort choice is kept.
    pub fn regenerate(&mut self) -> Result<(), MetricsError> {
        self.table = self.generator.generate()?;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    /// Re-derive change columns over the cached values.
    pub fn recompute(&mut self) {
        self.table.recompute();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(seed: u64) -> DashboardSession {
        let config = DashboardConfig::preset("technology").unwrap();
        DashboardSession::new(1, config, Some(seed)).unwrap()
    }

    #[test]
    fn table_is_cached_between_reads() {
        let s = session(3);
        let first = s.snapshot();
        let second = s.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.generation, 0);
    }

    #[test]
    fn default_sort_is_relative_change_ascending() {
        let s = session(3);
        let snap = s.snapshot();
        assert_eq!(snap.sort_field, SortField::RelativeChangePct);
        assert_eq!(snap.sort_direction, SortDirection::Ascending);
        for pair in snap.records.windows(2) {
            assert!(pair[0].relative_change_pct <= pair[1].relative_change_pct);
        }
    }

    #[test]
    fn set_sort_reorders_snapshot() {
        let mut s = session(3);
        s.set_sort(SortField::BaselineValue, SortDirection::Descending);
        let snap = s.snapshot();
        for pair in snap.records.windows(2) {
            assert!(pair[0].baseline_value >= pair[1].baseline_value);
        }
    }

    #[test]
    fn regenerate_bumps_generation_and_keeps_sort() {
        let mut s = session(3);
        s.set_sort(SortField::FollowupValue, SortDirection::Descending);
        let before = s.table().clone();
        s.regenerate().unwrap();
        assert_eq!(s.generation(), 1);
        assert_ne!(&before, s.table());
        assert_eq!(s.snapshot().sort_field, SortField::FollowupValue);
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        assert_eq!(session(9).table(), session(9).table());
    }

    #[test]
    fn different_ids_draw_different_tables() {
        let config = DashboardConfig::preset("technology-extended").unwrap();
        let a = DashboardSession::new(1, config.clone(), Some(5)).unwrap();
        let b = DashboardSession::new(2, config, Some(5)).unwrap();
        assert_ne!(a.table(), b.table());
    }

    #[test]
    fn recompute_keeps_values() {
        let mut s = session(4);
        let before = s.table().clone();
        s.recompute();
        assert_eq!(&before, s.table());
    }

    #[test]
    fn select_through_session() {
        let s = session(4);
        assert_eq!(s.select("Ate").unwrap().name, "Ate");
        assert!(matches!(
            s.select("Nowhere"),
            Err(MetricsError::SelectionNotFound(_))
        ));
    }
}
