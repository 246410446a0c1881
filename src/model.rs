/// Core data types for the winter ice popsicle pipeline.
///
/// This module defines the shared domain model imported by all other modules:
/// raw daily observations, their ice/flow classification, per-state daily
/// summaries, site metadata and the error types. It contains no I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter and qualifier codes
// ---------------------------------------------------------------------------

/// USGS parameter code for discharge (streamflow), in cubic feet per second.
pub const PARAM_DISCHARGE: &str = "00060";

/// USGS statistic code for the daily mean.
pub const STAT_DAILY_MEAN: &str = "00003";

/// Qualifier string the daily-values service attaches to a provisional,
/// ice-affected day. The numeric value is withheld on these days.
pub const ICE_QUALIFIER: &str = "P Ice";

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// One daily-mean discharge value from a USGS gage, tagged with the state
/// whose query produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub site_id: String,
    pub date: NaiveDate,
    /// `None` when the service reported its no-data sentinel.
    pub flow_value: Option<f64>,
    /// Qualifiers joined by a space, e.g. "P", "A", "P Ice".
    pub flow_qualifier_code: String,
    pub state_code: String,
}

/// Whether a day's reading was a real discharge value or an ice-affected gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Ice,
    Flow,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Ice => write!(f, "ice"),
            Condition::Flow => write!(f, "flow"),
        }
    }
}

/// An observation that survived classification.
///
/// Invariant: `observation.flow_value.is_some() || is_ice`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedObservation {
    pub observation: Observation,
    pub is_ice: bool,
    pub condition: Condition,
}

/// Display metadata for a gage, from the USGS site service.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInfo {
    pub site_id: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-state, per-day ice accounting.
///
/// Invariants: `total_count > 0`, `non_ice_count <= total_count`,
/// `0.0 <= percent_not_ice <= 100.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStateSummary {
    pub state_code: String,
    pub date: NaiveDate,
    pub total_count: usize,
    pub non_ice_count: usize,
    pub percent_not_ice: f64,
}

/// The chart written by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub path: std::path::PathBuf,
    /// Number of state panels drawn.
    pub panels: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding USGS NWIS data.
#[derive(Debug, Clone, PartialEq)]
pub enum NwisError {
    /// Non-2xx HTTP response from the USGS API.
    HttpError(u16),
    /// The request never produced a response (DNS, TLS, timeout...).
    Transport(String),
    /// The response body could not be deserialized.
    ParseError(String),
    /// The query succeeded but returned no time series.
    NoDataAvailable(String),
    /// A requested site code was absent from the site-service response.
    SiteNotFound(String),
}

impl std::fmt::Display for NwisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NwisError::HttpError(code) => write!(f, "HTTP error: {}", code),
            NwisError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NwisError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            NwisError::NoDataAvailable(what) => write!(f, "No data available for: {}", what),
            NwisError::SiteNotFound(site) => write!(f, "Site not found: {}", site),
        }
    }
}

impl std::error::Error for NwisError {}

/// Top-level run failure. Any of these aborts the pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Invalid or unreadable configuration.
    Config(String),
    /// A per-state daily-values fetch failed.
    Fetch { state: String, source: NwisError },
    /// The site-service request itself failed (not a missing site).
    SiteMetadata(NwisError),
    /// The fetch cache could not be written.
    Cache(String),
    /// Chart drawing or PNG encoding failed.
    Render(String),
    /// Filesystem error outside the cache.
    Io(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::Fetch { state, source } => {
                write!(f, "Fetch failed for state {}: {}", state, source)
            }
            PipelineError::SiteMetadata(source) => write!(f, "Site metadata fetch failed: {}", source),
            PipelineError::Cache(msg) => write!(f, "Cache error: {}", msg),
            PipelineError::Render(msg) => write!(f, "Render error: {}", msg),
            PipelineError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Fetch { source, .. } | PipelineError::SiteMetadata(source) => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_display_matches_labels() {
        assert_eq!(Condition::Ice.to_string(), "ice");
        assert_eq!(Condition::Flow.to_string(), "flow");
    }

    #[test]
    fn test_discharge_parameter_code_is_five_digits() {
        assert_eq!(PARAM_DISCHARGE.len(), 5);
        assert!(PARAM_DISCHARGE.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(STAT_DAILY_MEAN.len(), 5);
    }

    #[test]
    fn test_fetch_error_display_names_state() {
        let err = PipelineError::Fetch {
            state: "WI".to_string(),
            source: NwisError::HttpError(503),
        };
        assert_eq!(err.to_string(), "Fetch failed for state WI: HTTP error: 503");
        assert!(std::error::Error::source(&err).is_some());
    }
}
