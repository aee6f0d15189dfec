//! Standalone SVG line charts.
//!
//! Grey panel with white grid lines, min-to-max value axis, dated x axis,
//! one polyline per series. Non-finite values break the line.

use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use super::{ChartRenderer, ChartSpec, Series};
use crate::error::AppError;

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;
const MARKER_RADIUS: f64 = 3.0;

const BACKGROUND: &str = "#FFFFFF";
const PANEL: &str = "#E5E5E5";
const GRID: &str = "#FFFFFF";
const TEXT: &str = "#555555";

#[derive(Debug, Clone)]
pub struct SvgRenderer {
    font_family: String,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            font_family: "DejaVu Sans, Helvetica, Arial, sans-serif".to_string(),
        }
    }
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps dates and values onto panel pixels.
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x0: i64,
    x_span: f64,
    y_min: f64,
    y_span: f64,
}

impl Frame {
    fn new(spec: &ChartSpec, dates: (NaiveDate, NaiveDate), values: (f64, f64)) -> Self {
        let mut x0 = i64::from(dates.0.num_days_from_ce());
        let mut x_span = (i64::from(dates.1.num_days_from_ce()) - x0) as f64;
        if x_span <= 0.0 {
            // single date: centre it
            x0 -= 1;
            x_span = 2.0;
        }

        let (mut lo, mut hi) = values;
        if hi - lo <= 0.0 {
            let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
            lo -= pad;
            hi += pad;
        }
        let pad = (hi - lo) * 0.05;
        lo -= pad;
        hi += pad;

        Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: f64::from(spec.style.width) - MARGIN_LEFT - MARGIN_RIGHT,
            height: f64::from(spec.style.height) - MARGIN_TOP - MARGIN_BOTTOM,
            x0,
            x_span,
            y_min: lo,
            y_span: hi - lo,
        }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        let offset = (i64::from(date.num_days_from_ce()) - self.x0) as f64;
        self.left + offset / self.x_span * self.width
    }

    fn y(&self, value: f64) -> f64 {
        self.top + self.height - (value - self.y_min) / self.y_span * self.height
    }

    fn date_at(&self, fraction: f64) -> Option<NaiveDate> {
        let day = self.x0 + (fraction * self.x_span).round() as i64;
        i32::try_from(day)
            .ok()
            .and_then(NaiveDate::from_num_days_from_ce_opt)
    }
}

impl ChartRenderer for SvgRenderer {
    fn render(&self, spec: &ChartSpec) -> Result<String, AppError> {
        let width = f64::from(spec.style.width);
        let height = f64::from(spec.style.height);
        let panel_width = width - MARGIN_LEFT - MARGIN_RIGHT;
        let panel_height = height - MARGIN_TOP - MARGIN_BOTTOM;
        if panel_width <= 0.0 || panel_height <= 0.0 {
            return Err(AppError::Render(format!(
                "chart {} is too small ({}x{})",
                spec.id, spec.style.width, spec.style.height
            )));
        }

        let mut out = String::new();
        writeln!(
            out,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{font}">"##,
            w = spec.style.width,
            h = spec.style.height,
            font = escape(&self.font_family),
        )?;
        writeln!(out, "<title>{}</title>", escape(&spec.title))?;
        writeln!(out, r##"<rect width="{}" height="{}" fill="{}"/>"##, width, height, BACKGROUND)?;
        writeln!(
            out,
            r##"<rect x="{}" y="{}" width="{:.2}" height="{:.2}" fill="{}"/>"##,
            MARGIN_LEFT, MARGIN_TOP, panel_width, panel_height, PANEL
        )?;
        writeln!(
            out,
            r##"<text x="{:.2}" y="30" text-anchor="middle" font-size="18" fill="#333333">{}</text>"##,
            width / 2.0,
            escape(&spec.title)
        )?;
        writeln!(
            out,
            r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="14" fill="{}">{}</text>"##,
            MARGIN_LEFT + panel_width / 2.0,
            height - 15.0,
            TEXT,
            escape(&spec.x_label)
        )?;
        let y_label_y = MARGIN_TOP + panel_height / 2.0;
        writeln!(
            out,
            r##"<text x="20" y="{y:.2}" text-anchor="middle" font-size="14" fill="{}" transform="rotate(-90 20 {y:.2})">{}</text>"##,
            TEXT,
            escape(&spec.y_label),
            y = y_label_y,
        )?;

        match (spec.date_range(), spec.value_range()) {
            (Some(dates), Some(values)) => {
                let frame = Frame::new(spec, dates, values);
                self.write_axes(&mut out, spec, &frame)?;
                for series in &spec.series {
                    write_series(&mut out, series, &frame)?;
                }
                if spec.style.legend {
                    write_legend(&mut out, &spec.series, &frame)?;
                }
            }
            _ => {
                writeln!(
                    out,
                    r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="16" fill="{}">No data</text>"##,
                    MARGIN_LEFT + panel_width / 2.0,
                    MARGIN_TOP + panel_height / 2.0,
                    TEXT
                )?;
            }
        }

        out.push_str("</svg>\n");
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "svg"
    }
}

impl SvgRenderer {
    fn write_axes(
        &self,
        out: &mut String,
        spec: &ChartSpec,
        frame: &Frame,
    ) -> Result<(), AppError> {
        let right = frame.left + frame.width;
        let bottom = frame.top + frame.height;

        for i in 0..=TICKS {
            let fraction = i as f64 / TICKS as f64;

            let value = frame.y_min + fraction * frame.y_span;
            let y = frame.y(value);
            if spec.style.grid {
                writeln!(
                    out,
                    r##"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{}" stroke-width="1"/>"##,
                    frame.left,
                    right,
                    GRID,
                    y = y,
                )?;
            }
            writeln!(
                out,
                r##"<text x="{:.2}" y="{:.2}" text-anchor="end" font-size="11" fill="{}">{}</text>"##,
                frame.left - 8.0,
                y + 4.0,
                TEXT,
                format_tick(value)
            )?;

            let x = frame.left + fraction * frame.width;
            if spec.style.grid {
                writeln!(
                    out,
                    r##"<line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>"##,
                    frame.top,
                    bottom,
                    GRID,
                    x = x,
                )?;
            }
            if let Some(date) = frame.date_at(fraction) {
                writeln!(
                    out,
                    r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="11" fill="{}">{}</text>"##,
                    x,
                    bottom + 18.0,
                    TEXT,
                    date.format("%Y-%m")
                )?;
            }
        }
        Ok(())
    }
}

fn write_series(out: &mut String, series: &Series, frame: &Frame) -> Result<(), AppError> {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for point in &series.points {
        if point.value.is_finite() {
            current.push((frame.x(point.date), frame.y(point.value)));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    for run in &runs {
        if run.len() >= 2 {
            let mut coords = String::new();
            for (i, (x, y)) in run.iter().enumerate() {
                if i > 0 {
                    coords.push(' ');
                }
                write!(coords, "{:.2},{:.2}", x, y)?;
            }
            writeln!(
                out,
                r##"<polyline points="{}" fill="none" stroke="{}" stroke-opacity="{}" stroke-width="1.5"/>"##,
                coords, series.color, series.opacity
            )?;
        } else if !series.markers {
            // lone point between gaps would otherwise vanish
            let (x, y) = run[0];
            writeln!(
                out,
                r##"<circle cx="{:.2}" cy="{:.2}" r="1.5" fill="{}" fill-opacity="{}"/>"##,
                x, y, series.color, series.opacity
            )?;
        }

        if series.markers {
            for (x, y) in run {
                writeln!(
                    out,
                    r##"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" fill-opacity="{}"/>"##,
                    x, y, MARKER_RADIUS, series.color, series.opacity
                )?;
            }
        }
    }
    Ok(())
}

fn write_legend(out: &mut String, series: &[Series], frame: &Frame) -> Result<(), AppError> {
    let x = frame.left + 12.0;
    let mut y = frame.top + 12.0;
    let longest = series.iter().map(|s| s.label.chars().count()).max().unwrap_or(0);
    writeln!(
        out,
        r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="#FFFFFF" fill-opacity="0.8" stroke="#CCCCCC"/>"##,
        x - 6.0,
        y - 6.0,
        40.0 + longest as f64 * 7.0,
        series.len() as f64 * 20.0 + 8.0
    )?;
    for entry in series {
        writeln!(
            out,
            r##"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{}" stroke-opacity="{}" stroke-width="2"/>"##,
            x,
            x + 24.0,
            entry.color,
            entry.opacity,
            y = y + 6.0,
        )?;
        writeln!(
            out,
            r##"<text x="{:.2}" y="{:.2}" font-size="12" fill="#333333">{}</text>"##,
            x + 30.0,
            y + 10.0,
            escape(&entry.label)
        )?;
        y += 20.0;
    }
    Ok(())
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 {
        "0".to_string()
    } else if !(1e-3..1e6).contains(&magnitude) {
        format!("{:.2e}", value)
    } else if magnitude >= 100.0 {
        format!("{:.0}", value)
    } else {
        let fixed = format!("{:.4}", value);
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Escape text for use in SVG/HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
