/// Remote data acquisition.
///
/// Submodules:
/// - `usgs` — NWIS daily-values and site-service clients.

pub mod usgs;
