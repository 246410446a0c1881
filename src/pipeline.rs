/// End-to-end run: fetch → classify → aggregate → site metadata → render.
///
/// Each step is a plain function over in-memory values so the offline steps
/// can be exercised without the network. `run` wires them to the USGS client
/// and the optional fetch cache.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::analysis::daily::summarize_by_state_day;
use crate::cache;
use crate::classify::classify_all;
use crate::config::PipelineConfig;
use crate::ingest::usgs;
use crate::logging::{self, DataSource};
use crate::model::{
    DailyStateSummary, NwisError, Observation, PipelineError, RenderedImage, SiteInfo,
};
use crate::render::popsicles::{render_popsicles, RenderSettings};

/// What a run produced, for the caller to print or inspect.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub states_fetched: Vec<String>,
    /// States skipped under `continue_on_fetch_error`, with the reason.
    pub states_failed: Vec<(String, String)>,
    pub observations: usize,
    pub classified: usize,
    pub summaries: Vec<DailyStateSummary>,
    /// Fetched for completeness; the chart does not use locations.
    pub sites: Vec<SiteInfo>,
    pub sites_missing: Vec<String>,
    pub image: RenderedImage,
}

/// Result of the per-state fetch fan-out.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub observations: Vec<Observation>,
    pub fetched: Vec<String>,
    pub failed: Vec<(String, NwisError)>,
}

/// Why one state's fetch did not yield rows.
///
/// `Service` failures follow the skip/abort policy. `Fatal` stops the run at
/// that state regardless of policy.
#[derive(Debug)]
pub enum StateFetchFailure {
    Service(NwisError),
    Fatal(PipelineError),
}

impl From<NwisError> for StateFetchFailure {
    fn from(e: NwisError) -> Self {
        StateFetchFailure::Service(e)
    }
}

/// Summaries plus the row counts that produced them.
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub classified: usize,
    pub summaries: Vec<DailyStateSummary>,
}

pub fn build_client(config: &PipelineConfig) -> Result<reqwest::blocking::Client, PipelineError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| PipelineError::Config(format!("cannot build HTTP client: {}", e)))
}

/// Fetches every state in order with `fetch_one`.
///
/// Without `continue_on_error` the first failure aborts. With it, failures
/// are logged and collected, and only a run where every state failed aborts.
pub fn fetch_states<F, E>(
    states: &[String],
    continue_on_error: bool,
    mut fetch_one: F,
) -> Result<FetchOutcome, PipelineError>
where
    F: FnMut(&str) -> Result<Vec<Observation>, E>,
    E: Into<StateFetchFailure>,
{
    let mut outcome = FetchOutcome::default();

    for state in states {
        match fetch_one(state).map_err(Into::into) {
            Ok(rows) => {
                logging::info(
                    DataSource::Usgs,
                    Some(state.as_str()),
                    &format!("{}: {} daily values", state, rows.len()),
                );
                outcome.observations.extend(rows);
                outcome.fetched.push(state.clone());
            }
            Err(StateFetchFailure::Fatal(e)) => {
                logging::error(DataSource::System, Some(state.as_str()), &e.to_string());
                return Err(e);
            }
            Err(StateFetchFailure::Service(e)) => {
                logging::log_usgs_failure(state, "daily values fetch", &e);
                if !continue_on_error {
                    return Err(PipelineError::Fetch {
                        state: state.clone(),
                        source: e,
                    });
                }
                outcome.failed.push((state.clone(), e));
            }
        }
    }

    logging::log_fetch_summary(
        DataSource::Usgs,
        "State",
        states.len(),
        outcome.fetched.len(),
        outcome.failed.len(),
    );

    if outcome.fetched.is_empty() && !outcome.failed.is_empty() {
        let (state, e) = outcome.failed.remove(0);
        return Err(PipelineError::Fetch { state, source: e });
    }

    Ok(outcome)
}

/// Distinct site ids, sorted.
pub fn distinct_site_ids(observations: &[Observation]) -> Vec<String> {
    observations
        .iter()
        .map(|o| o.site_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Classify and aggregate.
pub fn aggregate(observations: &[Observation]) -> Aggregated {
    let classified = classify_all(observations);
    let dropped = observations.len() - classified.len();
    logging::debug(
        DataSource::System,
        None,
        &format!(
            "classified {} rows, dropped {} missing non-ice rows",
            classified.len(),
            dropped
        ),
    );
    Aggregated {
        classified: classified.len(),
        summaries: summarize_by_state_day(&classified),
    }
}

/// One state's observations, from cache when configured and present.
fn fetch_state_cached(
    client: &reqwest::blocking::Client,
    config: &PipelineConfig,
    state: &str,
) -> Result<Vec<Observation>, StateFetchFailure> {
    if let Some(dir) = &config.cache_dir {
        if let Some(rows) = cache::load(dir, state, config.start_date, config.end_date) {
            return Ok(rows);
        }
    }

    let rows = usgs::fetch_state_daily_values(
        client,
        &config.usgs_base_url,
        state,
        config.start_date,
        config.end_date,
    )?;

    if let Some(dir) = &config.cache_dir {
        cache::store(dir, state, config.start_date, config.end_date, &rows)
            .map_err(StateFetchFailure::Fatal)?;
    }
    Ok(rows)
}

/// Runs the whole pipeline against the live service.
pub fn run(config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    config.validate()?;
    let client = build_client(config)?;

    logging::info(
        DataSource::System,
        None,
        &format!(
            "Fetching {} states, {} to {}",
            config.states.len(),
            config.start_date,
            config.end_date
        ),
    );

    let fetched = fetch_states(&config.states, config.continue_on_fetch_error, |state| {
        fetch_state_cached(&client, config, state)
    })?;

    let aggregated = aggregate(&fetched.observations);

    let site_ids = distinct_site_ids(&fetched.observations);
    let (sites, sites_missing) = usgs::fetch_site_info(&client, &config.usgs_base_url, &site_ids)
        .map_err(PipelineError::SiteMetadata)?;
    for id in &sites_missing {
        logging::log_usgs_failure(id, "site metadata", &NwisError::SiteNotFound(id.clone()));
    }
    logging::log_fetch_summary(
        DataSource::Usgs,
        "Site",
        site_ids.len(),
        sites.len(),
        sites_missing.len(),
    );

    let image = render_popsicles(&aggregated.summaries, &RenderSettings::from_config(config))?;

    Ok(RunReport {
        states_fetched: fetched.fetched,
        states_failed: fetched
            .failed
            .into_iter()
            .map(|(s, e)| (s, e.to_string()))
            .collect(),
        observations: fetched.observations.len(),
        classified: aggregated.classified,
        summaries: aggregated.summaries,
        sites,
        sites_missing,
        image,
    })
}
