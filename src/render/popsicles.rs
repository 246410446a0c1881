//! Popsicle chart: one small multiple per state, seated by the state grid.
//!
//! Each panel shares the same coordinates. x is days since the window start,
//! padded 90 days either side; y is fixed to [-25, 100]. Bars rise from zero
//! to the day's percent-not-ice. A 40-day "stem" centred on the window
//! midpoint hangs below zero, and the state code is written on it.

use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::PipelineConfig;
use crate::logging::{self, DataSource};
use crate::model::{DailyStateSummary, PipelineError, RenderedImage};
use crate::state_grid::{self, grid_dimensions};

pub const X_PAD_DAYS: f64 = 90.0;
pub const STEM_HALF_WIDTH_DAYS: f64 = 20.0;
pub const Y_MIN: f64 = -25.0;
pub const Y_MAX: f64 = 100.0;

const BAR_COLOR: RGBColor = RGBColor(96, 170, 214);
const STEM_COLOR: RGBColor = RGBColor(196, 150, 98);

static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
static FONT_REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

/// Geometry shared by every panel.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Day the stem is centred on.
    pub midpoint: NaiveDate,
    pub output_path: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
}

impl RenderSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            start: config.start_date,
            end: config.end_date,
            midpoint: config.midpoint_date(),
            output_path: config.output_path.clone(),
            width_px: config.width_px,
            height_px: config.height_px,
        }
    }

    pub fn day_x(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64
    }

    pub fn x_range(&self) -> Range<f64> {
        -X_PAD_DAYS..self.day_x(self.end) + X_PAD_DAYS
    }

    pub fn midpoint_x(&self) -> f64 {
        self.day_x(self.midpoint)
    }

    /// Left and right edges of a day's bar, centred on the day.
    pub fn bar_span(&self, date: NaiveDate) -> (f64, f64) {
        let x = self.day_x(date);
        (x - 0.5, x + 0.5)
    }

    /// Lower-left and upper-right corners of the stem.
    pub fn stem(&self) -> [(f64, f64); 2] {
        let mid = self.midpoint_x();
        [
            (mid - STEM_HALF_WIDTH_DAYS, Y_MIN),
            (mid + STEM_HALF_WIDTH_DAYS, 0.0),
        ]
    }

    /// Where the state code is centred: the middle of the stem.
    pub fn label_anchor(&self) -> (f64, f64) {
        (self.midpoint_x(), Y_MIN / 2.0)
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Render(e.to_string())
}

fn ensure_font() -> Result<(), PipelineError> {
    FONT_REGISTERED
        .get_or_init(|| {
            plotters::style::register_font("sans-serif", FontStyle::Normal, FONT_BYTES)
                .map_err(|_| "bundled font rejected".to_string())
        })
        .clone()
        .map_err(PipelineError::Render)
}

/// Groups summaries by state, each state's days in date order.
pub fn group_by_state(summaries: &[DailyStateSummary]) -> BTreeMap<&str, Vec<&DailyStateSummary>> {
    let mut by_state: BTreeMap<&str, Vec<&DailyStateSummary>> = BTreeMap::new();
    for s in summaries {
        by_state.entry(s.state_code.as_str()).or_default().push(s);
    }
    for days in by_state.values_mut() {
        days.sort_by_key(|s| s.date);
    }
    by_state
}

/// Draws the chart and writes it to `settings.output_path`, replacing any
/// existing file. Missing parent directories are created.
pub fn render_popsicles(
    summaries: &[DailyStateSummary],
    settings: &RenderSettings,
) -> Result<RenderedImage, PipelineError> {
    ensure_font()?;

    if let Some(parent) = settings.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let root = BitMapBackend::new(&settings.output_path, (settings.width_px, settings.height_px))
        .into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let (rows, cols) = grid_dimensions();
    let panels = root.split_evenly((rows as usize, cols as usize));

    let mut drawn = 0;
    for (state, days) in group_by_state(summaries) {
        let Some(cell) = state_grid::find_state(state) else {
            logging::warn(DataSource::Render, Some(state), "no grid cell; panel skipped");
            continue;
        };
        let panel = &panels[(cell.row * cols + cell.col) as usize];
        draw_panel(panel, cell.code, &days, settings)?;
        drawn += 1;
    }

    root.present().map_err(render_err)?;

    logging::info(
        DataSource::Render,
        None,
        &format!("wrote {} ({} panels)", settings.output_path.display(), drawn),
    );

    Ok(RenderedImage {
        path: settings.output_path.clone(),
        panels: drawn,
    })
}

fn draw_panel<DB: DrawingBackend>(
    panel: &DrawingArea<DB, Shift>,
    code: &str,
    days: &[&DailyStateSummary],
    settings: &RenderSettings,
) -> Result<(), PipelineError> {
    let mut chart = ChartBuilder::on(panel)
        .margin(2)
        .build_cartesian_2d(settings.x_range(), Y_MIN..Y_MAX)
        .map_err(render_err)?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            settings.stem(),
            STEM_COLOR.filled(),
        )))
        .map_err(render_err)?;

    chart
        .draw_series(days.iter().map(|s| {
            let (left, right) = settings.bar_span(s.date);
            Rectangle::new([(left, 0.0), (right, s.percent_not_ice)], BAR_COLOR.filled())
        }))
        .map_err(render_err)?;

    let (_, panel_height) = panel.dim_in_pixel();
    let font_px = (panel_height as f64 * 0.12).max(8.0);
    let style = FontDesc::new(FontFamily::SansSerif, font_px, FontStyle::Normal)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    chart
        .draw_series(std::iter::once(Text::new(
            code.to_string(),
            settings.label_anchor(),
            style,
        )))
        .map_err(render_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(path: PathBuf) -> RenderSettings {
        RenderSettings {
            start: NaiveDate::from_ymd_opt(2020, 11, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
            midpoint: NaiveDate::from_ymd_opt(2021, 1, 15).unwrap(),
            output_path: path,
            width_px: 440,
            height_px: 320,
        }
    }

    fn summary(state: &str, month: u32, day: u32, pct: f64) -> DailyStateSummary {
        DailyStateSummary {
            state_code: state.to_string(),
            date: NaiveDate::from_ymd_opt(2020, month, day).unwrap(),
            total_count: 10,
            non_ice_count: (pct / 10.0) as usize,
            percent_not_ice: pct,
        }
    }

    #[test]
    fn test_x_range_pads_ninety_days_each_side() {
        let s = settings(PathBuf::from("unused.png"));
        let r = s.x_range();
        assert_eq!(r.start, -90.0);
        assert_eq!(r.end, 150.0 + 90.0);
    }

    #[test]
    fn test_stem_is_forty_days_centred_on_midpoint_below_zero() {
        let s = settings(PathBuf::from("unused.png"));
        let [(x0, y0), (x1, y1)] = s.stem();
        assert_eq!(x1 - x0, 40.0);
        assert_eq!((x0 + x1) / 2.0, 75.0);
        assert_eq!((y0, y1), (Y_MIN, 0.0));
        let (lx, ly) = s.label_anchor();
        assert_eq!(lx, 75.0);
        assert!(ly > y0 && ly < y1, "label must sit on the stem");
    }

    #[test]
    fn test_bars_are_centred_on_their_day() {
        let s = settings(PathBuf::from("unused.png"));
        assert_eq!(s.bar_span(s.midpoint), (74.5, 75.5));
        let (left, right) = s.bar_span(s.start);
        assert_eq!((left + right) / 2.0, 0.0);
    }

    #[test]
    fn test_from_config_takes_midpoint_from_window() {
        let config = PipelineConfig {
            start_date: NaiveDate::from_ymd_opt(2020, 12, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            ..PipelineConfig::default()
        };
        let s = RenderSettings::from_config(&config);
        assert_eq!(s.midpoint, NaiveDate::from_ymd_opt(2020, 12, 16).unwrap());
        assert_eq!(s.midpoint_x(), 15.0);
        let [(x0, _), (x1, _)] = s.stem();
        assert_eq!((x0, x1), (-5.0, 35.0));
    }

    #[test]
    fn test_font_registration_succeeds_and_is_repeatable() {
        assert!(ensure_font().is_ok());
        assert!(ensure_font().is_ok());
    }

    #[test]
    fn test_group_by_state_sorts_days() {
        let input = vec![
            summary("WI", 12, 3, 40.0),
            summary("MN", 12, 1, 10.0),
            summary("WI", 12, 1, 90.0),
        ];
        let grouped = group_by_state(&input);
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec!["MN", "WI"]);
        let wi_days: Vec<f64> = grouped["WI"].iter().map(|s| s.percent_not_ice).collect();
        assert_eq!(wi_days, vec![90.0, 40.0]);
    }

    #[test]
    fn test_render_writes_png_with_one_panel_per_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("popsicles.png");
        let input = vec![
            summary("WI", 12, 1, 60.0),
            summary("WI", 12, 2, 0.0),
            summary("MN", 12, 1, 100.0),
        ];
        let image = render_popsicles(&input, &settings(path.clone())).expect("render should succeed");
        assert_eq!(image.path, path);
        assert_eq!(image.panels, 2);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_render_with_no_summaries_writes_blank_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        let image = render_popsicles(&[], &settings(path.clone())).unwrap();
        assert_eq!(image.panels, 0);
        assert!(path.exists());
    }
}
