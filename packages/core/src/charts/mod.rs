//! Chart specifications and renderers.
//!
//! A `ChartSpec` is plain data: what to plot and how it should look.
//! Renderers turn specs into output documents and hold no state, so the
//! same spec always renders to the same bytes.

pub mod catalog;
pub mod svg;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;

pub use catalog::build_charts;
pub use svg::SvgRenderer;

/// Fixed line colours shared by every chart.
pub mod palette {
    /// First colour of the ggplot cycle, used when a chart names none.
    pub const DEFAULT: &str = "#E24A33";
    pub const PURPLE: &str = "#800080";
    pub const DARK_BLUE: &str = "#00008B";
    pub const GREEN: &str = "#008000";
    pub const RED: &str = "#FF0000";
    pub const DARK_RED: &str = "#8B0000";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub date: NaiveDate,
    /// Non-finite values are kept and skipped at render time.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub color: &'static str,
    pub opacity: f64,
    pub markers: bool,
    pub points: Vec<DataPoint>,
}

impl Series {
    pub fn new(label: impl Into<String>, color: &'static str, points: Vec<DataPoint>) -> Self {
        Self {
            label: label.into(),
            color,
            opacity: 1.0,
            markers: false,
            points,
        }
    }

    pub fn with_markers(mut self) -> Self {
        self.markers = true;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub grid: bool,
    pub legend: bool,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            grid: true,
            legend: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub style: ChartStyle,
}

impl ChartSpec {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
            style: ChartStyle::default(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_legend(mut self) -> Self {
        self.style.legend = true;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.style.width = width;
        self.style.height = height;
        self
    }

    /// Earliest and latest date over all series.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.date));
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Smallest and largest finite value over all series.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.value))
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }
}

/// Turns a chart specification into an output document.
pub trait ChartRenderer {
    fn render(&self, spec: &ChartSpec) -> Result<String, AppError>;

    /// File extension for documents this renderer produces.
    fn extension(&self) -> &'static str;
}
