//! Error types for drone_motion_planning

use std::time::Duration;

/// Main error type for the planning engine
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Open set exhausted before reaching the goal
    #[error("No path found after expanding {expanded} nodes")]
    NoPath { expanded: usize },
    /// Search stopped at the configured expansion limit
    #[error("Expansion limit of {limit} nodes reached")]
    ExpansionLimit { limit: usize },
    /// Search stopped at the configured deadline
    #[error("Search timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("Search cancelled")]
    Cancelled,
    /// Numerical computation failed (NaN coordinates, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Scenario file could not be parsed
    #[error("Scenario error: {0}")]
    Scenario(#[from] serde_json::Error),
    #[error("Visualization error: {0}")]
    Visualization(String),
}

impl PlanningError {
    /// Whether the error means the goal is unreachable, as opposed to a
    /// search that was stopped early or given bad input.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PlanningError::NoPath { .. })
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
