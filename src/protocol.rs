use serde::{Deserialize, Serialize};

use crate::dataset::{
    ChartRow, DistrictRecord, SortDirection, SortField, SortOptions, SummaryStats,
};
use crate::error::MetricsError;

// ── Client → server ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientRequest {
    /// Attach this connection to a session opened earlier.
    Resume { session_id: u64 },
    /// Current table in the session's sort order.
    Table,
    /// Change the sort. `field` is one of the sortable column names.
    Sort {
        field: String,
        direction: SortDirection,
    },
    /// A single district's record.
    Select { name: String },
    Summary,
    Chart,
    /// Discard the cached table and draw a new one.
    Regenerate,
    /// Re-derive change columns over the cached values.
    Recompute,
}

// ── Server → client ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub session_id: u64,
    pub generation: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub sort_options: SortOptions,
    pub records: Vec<DistrictRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Welcome {
        session_id: u64,
        title: String,
        metric: String,
        periods: [String; 2],
        /// District names in roster order, for the selection list.
        districts: Vec<String>,
        generation: u32,
    },
    Table(TableSnapshot),
    District {
        record: DistrictRecord,
        /// Follow-up score as a fraction of the ceiling.
        progress: f64,
    },
    Summary(SummaryStats),
    Chart(Vec<ChartRow>),
    Error { code: String, message: String },
}

impl From<MetricsError> for ServerMessage {
    fn from(err: MetricsError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
