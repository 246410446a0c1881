/// Chart output.
///
/// Submodules:
/// - `popsicles` — the state-grid bar chart PNG.

pub mod popsicles;
