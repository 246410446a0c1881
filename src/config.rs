/// Run configuration.
///
/// Defaults reproduce the fixed analysis: a northern-tier state list, the
/// 2020-21 winter window, and a 3000x3000 PNG in the working directory.
/// A `popsicles.toml` (or the file named by `POPSICLES_CONFIG`, which may
/// come from `.env`) can override any subset of fields.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::usgs::USGS_BASE_URL;
use crate::logging::LogLevel;
use crate::model::PipelineError;
use crate::state_grid;

pub const DEFAULT_CONFIG_FILE: &str = "popsicles.toml";
pub const CONFIG_ENV_VAR: &str = "POPSICLES_CONFIG";

pub const DEFAULT_STATES: &[&str] = &[
    "WA", "OR", "ID", "MT", "WY", "UT", "CO", "ND", "SD", "NE", "MN", "IA", "WI", "IL", "IN",
    "MI", "OH", "PA", "NY", "NJ", "VT", "NH", "ME", "MA", "CT", "RI",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Two-letter codes, one daily-values query each.
    pub states: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Rewritten on every run.
    pub output_path: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
    pub usgs_base_url: String,
    pub request_timeout_secs: u64,
    /// Per-state fetch cache; `None` always hits the network.
    pub cache_dir: Option<PathBuf>,
    /// Log and skip a failed state instead of aborting the run.
    pub continue_on_fetch_error: bool,
    pub log_level: String,
    pub log_file: Option<String>,
    pub log_timestamps: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            states: DEFAULT_STATES.iter().map(|s| s.to_string()).collect(),
            start_date: NaiveDate::from_ymd_opt(2020, 11, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2021, 3, 31).unwrap_or_default(),
            output_path: PathBuf::from("ice_popsicles.png"),
            width_px: 3000,
            height_px: 3000,
            usgs_base_url: USGS_BASE_URL.to_string(),
            request_timeout_secs: 60,
            cache_dir: None,
            continue_on_fetch_error: false,
            log_level: "info".to_string(),
            log_file: None,
            log_timestamps: false,
        }
    }
}

impl PipelineConfig {
    /// Loads `.env`, then the config file it (or the default) names.
    /// A missing file means defaults; a present but invalid file is an error.
    pub fn load() -> Result<Self, PipelineError> {
        dotenv::dotenv().ok();
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let path = Path::new(&path);

        if !path.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.states = config.states.iter().map(|s| s.trim().to_ascii_uppercase()).collect();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.start_date > self.end_date {
            return Err(PipelineError::Config(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.states.is_empty() {
            return Err(PipelineError::Config("states list is empty".into()));
        }
        if let Some(bad) = self.states.iter().find(|s| state_grid::find_state(s).is_none()) {
            return Err(PipelineError::Config(format!("unknown state code '{}'", bad)));
        }
        if self.width_px == 0 || self.height_px == 0 {
            return Err(PipelineError::Config("image size must be non-zero".into()));
        }
        LogLevel::parse(&self.log_level)
            .ok_or_else(|| PipelineError::Config(format!("unknown log_level '{}'", self.log_level)))?;
        Ok(())
    }

    /// Midpoint of the window, rounded down to a whole day.
    pub fn midpoint_date(&self) -> NaiveDate {
        let span = (self.end_date - self.start_date).num_days();
        self.start_date + chrono::Duration::days(span / 2)
    }

    pub fn min_log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level).unwrap_or(LogLevel::Info)
    }
}
