/// Offline scenario tests for the popsicle pipeline
///
/// These tests drive the steps after the network fetch with hand-built
/// daily-values responses:
/// 1. Parse a WaterML-JSON body into observations
/// 2. Classify and aggregate into per-state daily summaries
/// 3. Render the chart, twice, to the same path
///
/// Run with: cargo test --test pipeline_scenarios

use chrono::NaiveDate;
use ice_popsicles::ingest::usgs;
use ice_popsicles::model::{ICE_QUALIFIER, PipelineError};
use ice_popsicles::pipeline::{aggregate, distinct_site_ids, fetch_states};
use ice_popsicles::render::popsicles::{render_popsicles, RenderSettings};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// One point: (value string, qualifiers).
type Point<'a> = (&'a str, &'a [&'a str]);

fn series_json(site: &str, date: &str, points: &[Point]) -> String {
    let values: Vec<String> = points
        .iter()
        .map(|(value, qualifiers)| {
            let q: Vec<String> = qualifiers.iter().map(|q| format!("\"{}\"", q)).collect();
            format!(
                r#"{{"value": "{}", "qualifiers": [{}], "dateTime": "{}T00:00:00.000"}}"#,
                value,
                q.join(", "),
                date
            )
        })
        .collect();
    format!(
        r#"{{
            "sourceInfo": {{"siteCode": [{{"value": "{}"}}]}},
            "variable": {{"noDataValue": -999999.0}},
            "values": [{{"value": [{}]}}]
        }}"#,
        site,
        values.join(", ")
    )
}

fn dv_body(series: &[String]) -> String {
    format!(r#"{{"value": {{"timeSeries": [{}]}}}}"#, series.join(", "))
}

/// Five Wisconsin gages on 2020-12-01: two ice-affected, three flowing.
fn wisconsin_body() -> String {
    let ice: &[&str] = &["P", "Ice"];
    let provisional: &[&str] = &["P"];
    let approved: &[&str] = &["A"];
    dv_body(&[
        series_json("05407000", "2020-12-01", &[("-999999", ice)]),
        series_json("05331000", "2020-12-01", &[("-999999", ice)]),
        series_json("05340500", "2020-12-01", &[("5230", provisional)]),
        series_json("05365500", "2020-12-01", &[("1730", provisional)]),
        series_json("05382000", "2020-12-01", &[("412", approved)]),
    ])
}

fn settings(path: std::path::PathBuf) -> RenderSettings {
    RenderSettings {
        start: NaiveDate::from_ymd_opt(2020, 11, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
        midpoint: NaiveDate::from_ymd_opt(2021, 1, 15).unwrap(),
        output_path: path,
        width_px: 550,
        height_px: 400,
    }
}

// ---------------------------------------------------------------------------
// Classification and aggregation scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_wisconsin_scenario_is_sixty_percent_not_ice() {
    let observations = usgs::parse_dv_response(&wisconsin_body(), "WI").expect("fixture should parse");
    assert_eq!(observations.len(), 5);
    assert_eq!(
        observations.iter().filter(|o| o.flow_qualifier_code == ICE_QUALIFIER).count(),
        2
    );

    let aggregated = aggregate(&observations);
    assert_eq!(aggregated.classified, 5);
    assert_eq!(aggregated.summaries.len(), 1);

    let s = &aggregated.summaries[0];
    assert_eq!(s.state_code, "WI");
    assert_eq!(s.date, NaiveDate::from_ymd_opt(2020, 12, 1).unwrap());
    assert_eq!(s.total_count, 5);
    assert_eq!(s.non_ice_count, 3);
    assert_eq!(s.percent_not_ice, 60.00);
}

#[test]
fn test_ohio_lone_missing_reading_emits_no_summary() {
    let equipment: &[&str] = &["P", "Eqp"];
    let body = dv_body(&[series_json("03255000", "2020-12-01", &[("-999999", equipment)])]);
    let observations = usgs::parse_dv_response(&body, "OH").unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].flow_value, None);

    let aggregated = aggregate(&observations);
    assert_eq!(aggregated.classified, 0, "missing non-ice reading must be dropped");
    assert!(aggregated.summaries.is_empty());
}

#[test]
fn test_multi_state_fetch_tags_rows_by_state() {
    let wi = wisconsin_body();
    let ice: &[&str] = &["P", "Ice"];
    let mn = dv_body(&[series_json("05331580", "2020-12-01", &[("-999999", ice)])]);
    let states = vec!["WI".to_string(), "MN".to_string()];

    let outcome = fetch_states(&states, false, |state| match state {
        "WI" => usgs::parse_dv_response(&wi, state),
        _ => usgs::parse_dv_response(&mn, state),
    })
    .expect("both fixtures should parse");

    assert_eq!(outcome.fetched, vec!["WI", "MN"]);
    assert_eq!(distinct_site_ids(&outcome.observations).len(), 6);

    let summaries = aggregate(&outcome.observations).summaries;
    let mn_summary = summaries.iter().find(|s| s.state_code == "MN").unwrap();
    assert_eq!(mn_summary.non_ice_count, 0);
    assert_eq!(mn_summary.percent_not_ice, 0.0);
}

#[test]
fn test_state_with_no_series_aborts_the_run() {
    let empty = dv_body(&[]);
    let states = vec!["WI".to_string(), "DE".to_string()];
    let wi = wisconsin_body();

    let result = fetch_states(&states, false, |state| match state {
        "WI" => usgs::parse_dv_response(&wi, state),
        _ => usgs::parse_dv_response(&empty, state),
    });

    match result {
        Err(PipelineError::Fetch { state, .. }) => assert_eq!(state, "DE"),
        other => panic!("expected DE fetch failure, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn test_rerender_overwrites_same_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ice_popsicles.png");

    let observations = usgs::parse_dv_response(&wisconsin_body(), "WI").unwrap();
    let summaries = aggregate(&observations).summaries;

    let first = render_popsicles(&summaries, &settings(path.clone())).expect("first render");
    let first_bytes = std::fs::read(&path).unwrap();

    let second = render_popsicles(&summaries, &settings(path.clone())).expect("rerender must not fail");
    let second_bytes = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.path, path);
    assert_eq!(first_bytes, second_bytes, "identical input should produce identical output");

    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1, "rerun should reuse the one output file");
}
