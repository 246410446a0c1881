/// Per-state daily ice accounting.
///
/// Groups are only formed from rows that exist, so every summary has
/// `total_count >= 1` and the percentage needs no zero guard.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::model::{ClassifiedObservation, Condition, DailyStateSummary};

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summarizes classified observations by `(state_code, date)`.
///
/// Output is sorted by state code, then date.
pub fn summarize_by_state_day(classified: &[ClassifiedObservation]) -> Vec<DailyStateSummary> {
    let mut groups: BTreeMap<(&str, NaiveDate), (usize, usize)> = BTreeMap::new();

    for c in classified {
        let key = (c.observation.state_code.as_str(), c.observation.date);
        let (total, non_ice) = groups.entry(key).or_insert((0, 0));
        *total += 1;
        if c.condition == Condition::Flow {
            *non_ice += 1;
        }
    }

    groups
        .into_iter()
        .map(|((state_code, date), (total_count, non_ice_count))| DailyStateSummary {
            state_code: state_code.to_string(),
            date,
            total_count,
            non_ice_count,
            percent_not_ice: round2(100.0 * non_ice_count as f64 / total_count as f64),
        })
        .collect()
}
