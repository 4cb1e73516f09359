//! Chart Plotter Module
//! Prepares plot geometry from a case table and draws it with plotters.

use crate::data::CaseTable;
use crate::stats::Peak;
use chrono::{Days, NaiveDate};
use plotters::prelude::*;

/// Series colors
pub const RAW_COLOR: RGBColor = RGBColor(31, 119, 180); // Blue
pub const AVG_COLOR: RGBColor = RGBColor(255, 127, 14); // Orange
pub const PEAK_COLOR: RGBColor = RGBColor(214, 39, 40); // Red
pub const GRID_COLOR: RGBColor = RGBColor(200, 200, 200);

pub const RAW_LABEL: &str = "Daily Cases";
pub const PEAK_LABEL: &str = "Peak Cases";
pub const X_AXIS_LABEL: &str = "Date";
pub const Y_AXIS_LABEL: &str = "Number of Cases";

const FONT: &str = "sans-serif";
const PEAK_RADIUS: i32 = 8;

/// A peak marker in plot coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMarker {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// Render-only description of the chart.
///
/// The x axis is measured in days since `origin` so the plotting code works
/// on plain `f64` ranges; tick labels are turned back into dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub origin: NaiveDate,
    /// Raw series split into contiguous runs of observed values.
    pub raw_segments: Vec<Vec<(f64, f64)>>,
    pub avg_segments: Vec<Vec<(f64, f64)>>,
    /// Legend text for the moving average, present when the table carries one.
    pub avg_label: Option<String>,
    pub peaks: Vec<PeakMarker>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl ChartData {
    /// Build chart geometry; `None` when the table has no records.
    pub fn from_table(table: &CaseTable, peaks: &[Peak], title: &str) -> Option<Self> {
        let origin = table.records().iter().map(|r| r.date).min()?;
        let offset = |date: NaiveDate| (date - origin).num_days() as f64;

        let raw_segments = Self::segments(
            table
                .records()
                .iter()
                .map(|r| (offset(r.date), r.daily_cases)),
        );

        let (avg_segments, avg_label) = match table.moving_avg_window() {
            Some(window) => (
                Self::segments(
                    table
                        .records()
                        .iter()
                        .map(|r| (offset(r.date), r.moving_avg)),
                ),
                Some(format!("{window}-Day Moving Average")),
            ),
            None => (Vec::new(), None),
        };

        let peaks: Vec<PeakMarker> = peaks
            .iter()
            .map(|p| PeakMarker {
                x: offset(p.date),
                y: p.cases,
                label: format_count(p.cases),
            })
            .collect();

        let last = table
            .records()
            .iter()
            .map(|r| offset(r.date))
            .fold(0.0, f64::max);
        let x_range = if last > 0.0 { (0.0, last) } else { (-1.0, 1.0) };

        let y_max = raw_segments
            .iter()
            .chain(avg_segments.iter())
            .flatten()
            .map(|&(_, y)| y)
            .chain(peaks.iter().map(|p| p.y))
            .fold(0.0, f64::max);
        let y_min = raw_segments
            .iter()
            .flatten()
            .map(|&(_, y)| y)
            .fold(0.0, f64::min);
        // Headroom keeps peak markers and their labels inside the plot.
        let y_range = if y_max > y_min {
            (y_min, y_max + (y_max - y_min) * 0.12)
        } else {
            (y_min, y_min + 1.0)
        };

        Some(Self {
            title: title.to_string(),
            origin,
            raw_segments,
            avg_segments,
            avg_label,
            peaks,
            x_range,
            y_range,
        })
    }

    /// Split `(x, value)` pairs into runs without missing values.
    fn segments<I>(points: I) -> Vec<Vec<(f64, f64)>>
    where
        I: IntoIterator<Item = (f64, Option<f64>)>,
    {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (x, value) in points {
            match value {
                Some(y) => current.push((x, y)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    /// Format an x coordinate (days since origin) as a calendar date.
    pub fn format_x(&self, x: f64) -> String {
        let days = x.round();
        let date = if days >= 0.0 {
            self.origin.checked_add_days(Days::new(days as u64))
        } else {
            self.origin.checked_sub_days(Days::new((-days) as u64))
        };
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Human readable count: integers without decimals.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Draws a [`ChartData`] onto an RGB pixel buffer.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Draw the chart into `buffer` (`width * height * 3` bytes, RGB).
    pub fn draw(
        buffer: &mut [u8],
        size: (u32, u32),
        data: &ChartData,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE)?;

        let scale = size.0 as f64 / 1200.0;
        let font_px = |base: f64| (base * scale).round().max(8.0);

        let (x0, x1) = data.x_range;
        let (y0, y1) = data.y_range;

        let mut chart = ChartBuilder::on(&root)
            .caption(&data.title, (FONT, font_px(24.0)).into_font())
            .margin((20.0 * scale) as u32)
            .x_label_area_size((70.0 * scale) as u32)
            .y_label_area_size((90.0 * scale) as u32)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        let x_fmt = |x: &f64| data.format_x(*x);
        let y_fmt = |y: &f64| format!("{y:.0}");

        chart
            .configure_mesh()
            .x_desc(X_AXIS_LABEL)
            .y_desc(Y_AXIS_LABEL)
            .x_labels(10)
            .y_labels(10)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .axis_desc_style((FONT, font_px(16.0)))
            .label_style((FONT, font_px(12.0)))
            .bold_line_style(&GRID_COLOR.mix(0.6))
            .light_line_style(&GRID_COLOR.mix(0.2))
            .draw()?;

        for (idx, segment) in data.raw_segments.iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(
                segment.iter().copied(),
                RAW_COLOR.mix(0.7).stroke_width(2),
            ))?;
            if idx == 0 {
                series.label(RAW_LABEL).legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], RAW_COLOR.stroke_width(2))
                });
            }
        }

        if let Some(label) = &data.avg_label {
            for (idx, segment) in data.avg_segments.iter().enumerate() {
                let series = chart.draw_series(LineSeries::new(
                    segment.iter().copied(),
                    AVG_COLOR.stroke_width(3),
                ))?;
                if idx == 0 {
                    series.label(label.as_str()).legend(|(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], AVG_COLOR.stroke_width(3))
                    });
                }
            }
        }

        if !data.peaks.is_empty() {
            let label_font = (FONT, font_px(13.0)).into_font();
            chart
                .draw_series(data.peaks.iter().map(|p| {
                    EmptyElement::at((p.x, p.y))
                        + Circle::new((0, 0), PEAK_RADIUS, PEAK_COLOR.filled())
                        + Circle::new((0, 0), PEAK_RADIUS, BLACK.stroke_width(2))
                        + Text::new(
                            p.label.clone(),
                            (PEAK_RADIUS + 4, -PEAK_RADIUS - 16),
                            label_font.clone(),
                        )
                }))?
                .label(PEAK_LABEL)
                .legend(|(x, y)| Circle::new((x + 10, y), 6, PEAK_COLOR.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT, font_px(14.0)))
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}
