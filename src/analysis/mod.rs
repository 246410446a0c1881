/// Aggregation of classified observations.
///
/// Submodules:
/// - `daily` — per-state, per-day percent-not-ice summaries.

pub mod daily;
