use std::fmt;
use std::path::PathBuf;

/// Everything that can go wrong while configuring, generating or querying
/// a district table.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// Roster or range configuration rejected at construction time.
    InvalidConfig(String),
    /// The same district name appears twice in a roster.
    DuplicateDistrict(String),
    /// A config file could not be read or parsed.
    ConfigLoad { path: PathBuf, reason: String },
    /// The requested district is not in the table.
    SelectionNotFound(String),
    /// Sort requested on a field that is not sortable.
    UnknownSortField(String),
    /// No cached session with this id.
    UnknownSession(u64),
    /// Every cached session has a live connection; none can be evicted.
    SessionLimit(usize),
    /// A request parameter could not be interpreted.
    InvalidParameter { name: String, value: String },
}

impl MetricsError {
    /// Stable machine-readable code, sent to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::InvalidConfig(_) => "invalid_config",
            MetricsError::DuplicateDistrict(_) => "duplicate_district",
            MetricsError::ConfigLoad { .. } => "config_load",
            MetricsError::SelectionNotFound(_) => "selection_not_found",
            MetricsError::UnknownSortField(_) => "unknown_sort_field",
            MetricsError::UnknownSession(_) => "unknown_session",
            MetricsError::SessionLimit(_) => "session_limit",
            MetricsError::InvalidParameter { .. } => "invalid_parameter",
        }
    }
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::InvalidConfig(reason) => write!(f, "invalid config: {}", reason),
            MetricsError::DuplicateDistrict(name) => {
                write!(f, "district '{}' appears more than once in the roster", name)
            }
            MetricsError::ConfigLoad { path, reason } => {
                write!(f, "failed to load config {}: {}", path.display(), reason)
            }
            MetricsError::SelectionNotFound(name) => write!(f, "district '{}' not found", name),
            MetricsError::UnknownSortField(field) => write!(f, "cannot sort by '{}'", field),
            MetricsError::UnknownSession(id) => write!(f, "no session with id {}", id),
            MetricsError::SessionLimit(max) => {
                write!(f, "all {} sessions are in use", max)
            }
            MetricsError::InvalidParameter { name, value } => {
                write!(f, "invalid value '{}' for '{}'", value, name)
            }
        }
    }
}

impl std::error::Error for MetricsError {}
