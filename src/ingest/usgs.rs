/// USGS NWIS Water Services client.
///
/// Two endpoints are used:
/// - Daily Values (`/dv/`), queried once per state for daily-mean discharge
///   over the winter window, decoded from WaterML-JSON.
/// - Site Service (`/site/`), queried in batches of site codes for names and
///   coordinates, decoded from tab-delimited RDB.
///
/// API Documentation: https://waterservices.usgs.gov/docs/

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

use crate::model::{NwisError, Observation, SiteInfo, PARAM_DISCHARGE, STAT_DAILY_MEAN};

pub const USGS_BASE_URL: &str = "https://waterservices.usgs.gov/nwis";

/// Upper bound on site codes per site-service request, keeping the URL
/// well under server limits.
pub const SITE_BATCH_SIZE: usize = 100;

// ============================================================================
// Daily Values response structures (WaterML-JSON, trimmed to what we read)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DvResponse {
    pub value: DvValue,
}

#[derive(Debug, Deserialize)]
pub struct DvValue {
    #[serde(rename = "timeSeries", default)]
    pub time_series: Vec<DvTimeSeries>,
}

#[derive(Debug, Deserialize)]
pub struct DvTimeSeries {
    #[serde(rename = "sourceInfo")]
    pub source_info: DvSourceInfo,
    pub variable: DvVariable,
    #[serde(default)]
    pub values: Vec<DvValueBlock>,
}

#[derive(Debug, Deserialize)]
pub struct DvSourceInfo {
    #[serde(rename = "siteCode", default)]
    pub site_code: Vec<DvSiteCode>,
}

#[derive(Debug, Deserialize)]
pub struct DvSiteCode {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct DvVariable {
    #[serde(rename = "noDataValue")]
    pub no_data_value: Option<f64>,
}

/// One method's worth of points. A series may carry several; only the first
/// (primary) block is read.
#[derive(Debug, Deserialize)]
pub struct DvValueBlock {
    #[serde(default)]
    pub value: Vec<DvPoint>,
}

#[derive(Debug, Deserialize)]
pub struct DvPoint {
    pub value: String,
    #[serde(default)]
    pub qualifiers: Vec<String>,
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

// ============================================================================
// URL construction
// ============================================================================

/// Builds the daily-values query for one state's discharge over a window.
///
/// `siteStatus=all` keeps gages that have since gone inactive, so a rerun
/// over a past winter sees the same site set.
pub fn build_dv_url(base_url: &str, state_code: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}/dv/?format=json&stateCd={}&parameterCd={}&statCd={}&startDT={}&endDT={}&siteStatus=all",
        base_url.trim_end_matches('/'),
        state_code.to_ascii_lowercase(),
        PARAM_DISCHARGE,
        STAT_DAILY_MEAN,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
    )
}

/// Builds the site-service query for a batch of site codes.
pub fn build_site_url(base_url: &str, site_ids: &[&str]) -> String {
    format!(
        "{}/site/?format=rdb&sites={}&siteStatus=all",
        base_url.trim_end_matches('/'),
        site_ids.join(","),
    )
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a daily-values response into observations tagged with `state_code`.
///
/// Values equal to the series' no-data sentinel, or that do not parse as a
/// number, become `flow_value: None`; the row itself is kept so the
/// classifier can decide whether it was ice.
pub fn parse_dv_response(body: &str, state_code: &str) -> Result<Vec<Observation>, NwisError> {
    let response: DvResponse =
        serde_json::from_str(body).map_err(|e| NwisError::ParseError(e.to_string()))?;

    if response.value.time_series.is_empty() {
        return Err(NwisError::NoDataAvailable(format!(
            "No timeSeries entries in response for state {}",
            state_code
        )));
    }

    let mut observations = Vec::new();
    for series in response.value.time_series {
        let site_id = series
            .source_info
            .site_code
            .first()
            .map(|c| c.value.clone())
            .ok_or_else(|| NwisError::ParseError("timeSeries entry without siteCode".into()))?;
        let no_data = series.variable.no_data_value;

        let Some(block) = series.values.into_iter().next() else {
            continue;
        };

        for point in block.value {
            let date = parse_dv_date(&point.date_time)?;
            observations.push(Observation {
                site_id: site_id.clone(),
                date,
                flow_value: parse_flow_value(&point.value, no_data),
                flow_qualifier_code: point.qualifiers.join(" "),
                state_code: state_code.to_ascii_uppercase(),
            });
        }
    }

    Ok(observations)
}

/// Daily values carry a midnight timestamp, e.g. "2020-12-01T00:00:00.000".
fn parse_dv_date(date_time: &str) -> Result<NaiveDate, NwisError> {
    date_time
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| NwisError::ParseError(format!("bad dateTime '{}'", date_time)))
}

fn parse_flow_value(raw: &str, no_data: Option<f64>) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    match no_data {
        Some(sentinel) if (value - sentinel).abs() < 1e-6 => None,
        _ => Some(value),
    }
}

/// Decodes a site-service RDB body.
///
/// RDB layout: `#` comment lines, a tab-separated header, a column-width
/// line (`5s\t15s\t...`), then one tab-separated row per site.
pub fn parse_site_rdb(body: &str) -> Result<Vec<SiteInfo>, NwisError> {
    let mut lines = body
        .lines()
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty());

    let header: Vec<&str> = match lines.next() {
        Some(h) => h.split('\t').collect(),
        None => return Ok(Vec::new()),
    };
    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| NwisError::ParseError(format!("RDB header missing column '{}'", name)))
    };
    let site_col = column("site_no")?;
    let name_col = column("station_nm")?;
    let lat_col = column("dec_lat_va")?;
    let lon_col = column("dec_long_va")?;

    // Column-width line.
    lines.next();

    let mut sites = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |i: usize| fields.get(i).map(|s| s.trim()).unwrap_or("");

        let site_id = field(site_col);
        if site_id.is_empty() {
            continue; // Skip incomplete rows
        }
        let (Ok(latitude), Ok(longitude)) = (field(lat_col).parse(), field(lon_col).parse()) else {
            continue; // Site without decimal coordinates cannot be placed
        };

        sites.push(SiteInfo {
            site_id: site_id.to_string(),
            display_name: field(name_col).to_string(),
            latitude,
            longitude,
        });
    }

    Ok(sites)
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Fetch one state's daily discharge for the window.
pub fn fetch_state_daily_values(
    client: &reqwest::blocking::Client,
    base_url: &str,
    state_code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Observation>, NwisError> {
    let url = build_dv_url(base_url, state_code, start, end);
    let body = get_text(client, &url)?;
    parse_dv_response(&body, state_code)
}

/// Fetch metadata for a set of site codes.
///
/// Returns the sites found plus the requested codes that were not in any
/// response. A batch answered with 404 (the service's "no sites found")
/// counts every code in it as missing rather than failing.
pub fn fetch_site_info(
    client: &reqwest::blocking::Client,
    base_url: &str,
    site_ids: &[String],
) -> Result<(Vec<SiteInfo>, Vec<String>), NwisError> {
    collect_site_batches(site_ids, |ids| get_text(client, &build_site_url(base_url, ids)))
}

/// Requests `site_ids` in `SITE_BATCH_SIZE` batches through `fetch_batch`
/// and folds the RDB bodies into found sites plus missing ids.
///
/// A 404 batch contributes nothing, so all its ids end up missing. Any other
/// error aborts.
pub fn collect_site_batches<F>(
    site_ids: &[String],
    mut fetch_batch: F,
) -> Result<(Vec<SiteInfo>, Vec<String>), NwisError>
where
    F: FnMut(&[&str]) -> Result<String, NwisError>,
{
    let mut found = Vec::new();

    for batch in site_ids.chunks(SITE_BATCH_SIZE) {
        let ids: Vec<&str> = batch.iter().map(String::as_str).collect();
        match fetch_batch(&ids) {
            Ok(body) => found.extend(parse_site_rdb(&body)?),
            Err(NwisError::HttpError(404)) => {}
            Err(e) => return Err(e),
        }
    }

    let missing = missing_site_ids(site_ids, &found);
    Ok((found, missing))
}

/// Requested ids with no matching `SiteInfo`, in request order.
pub fn missing_site_ids(requested: &[String], found: &[SiteInfo]) -> Vec<String> {
    let found_ids: HashSet<&str> = found.iter().map(|s| s.site_id.as_str()).collect();
    requested
        .iter()
        .filter(|id| !found_ids.contains(id.as_str()))
        .cloned()
        .collect()
}

fn get_text(client: &reqwest::blocking::Client, url: &str) -> Result<String, NwisError> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| NwisError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(NwisError::HttpError(response.status().as_u16()));
    }

    response.text().map_err(|e| NwisError::Transport(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
