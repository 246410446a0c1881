//! Winter ice "popsicles": how much of each state's gage network read ice,
//! day by day, drawn as bar charts seated on a US state grid.
//!
//! Modules, leaves first:
//! - `model` — shared data types and errors
//! - `state_grid` — static state seating chart
//! - `ingest` — USGS daily-values and site-service clients
//! - `classify` — ice/flow labelling
//! - `analysis` — per-state daily aggregation
//! - `render` — PNG output
//! - `cache` — optional per-state fetch cache
//! - `config`, `logging` — run settings and structured log output
//! - `pipeline` — the end-to-end run

pub mod analysis;
pub mod cache;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod state_grid;
