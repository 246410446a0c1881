//! Per-state fetch cache.
//!
//! When a cache directory is configured, each state's decoded observations
//! are kept as JSON keyed by state and window, and a rerun reads them back
//! instead of querying USGS. There is no expiry: a past winter's daily values
//! are treated as settled.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{self, DataSource};
use crate::model::{Observation, PipelineError};

/// Cache file for one state's daily values over a window.
pub fn entry_path(cache_dir: &Path, state_code: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
    cache_dir.join(format!(
        "dv_{}_{}_{}.json",
        state_code.to_ascii_uppercase(),
        start.format("%Y%m%d"),
        end.format("%Y%m%d"),
    ))
}

/// Returns cached observations, or `None` if there is no usable entry.
///
/// A corrupt or unreadable entry is logged and treated as a miss so the
/// state is refetched and the entry rewritten.
pub fn load(
    cache_dir: &Path,
    state_code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Option<Vec<Observation>> {
    let path = entry_path(cache_dir, state_code, start, end);
    if !path.exists() {
        return None;
    }

    let parsed = fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<Vec<Observation>>(&text).map_err(|e| e.to_string()));

    match parsed {
        Ok(observations) => {
            logging::debug(
                DataSource::Cache,
                Some(state_code),
                &format!("hit: {} observations from {}", observations.len(), path.display()),
            );
            Some(observations)
        }
        Err(e) => {
            logging::warn(
                DataSource::Cache,
                Some(state_code),
                &format!("ignoring unusable entry {}: {}", path.display(), e),
            );
            None
        }
    }
}

/// Writes a state's observations, replacing any previous entry.
pub fn store(
    cache_dir: &Path,
    state_code: &str,
    start: NaiveDate,
    end: NaiveDate,
    observations: &[Observation],
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(cache_dir).map_err(|e| {
        PipelineError::Cache(format!("cannot create {}: {}", cache_dir.display(), e))
    })?;

    let path = entry_path(cache_dir, state_code, start, end);
    let json = serde_json::to_string(observations)
        .map_err(|e| PipelineError::Cache(format!("cannot encode {}: {}", state_code, e)))?;

    // Write-then-rename so an interrupted run never leaves a half entry.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .and_then(|_| fs::rename(&tmp, &path))
        .map_err(|e| PipelineError::Cache(format!("cannot write {}: {}", path.display(), e)))?;

    Ok(path)
}
