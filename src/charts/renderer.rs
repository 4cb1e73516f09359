//! Static Chart Renderer
//! Writes the daily case chart to a PNG file.
//!
//! Flow:
//! 1. Build [`ChartData`] from the table (fails on an empty table before any
//!    filesystem access).
//! 2. Make sure the output directory exists.
//! 3. Draw into an in-memory RGB buffer with plotters.
//! 4. Encode the buffer as PNG next to the destination and rename it into
//!    place, so a failed run never leaves a truncated file under the final name.

use crate::charts::{ChartData, ChartPlotter};
use crate::data::CaseTable;
use crate::stats::Peak;
use chrono::{DateTime, TimeZone};
use image::{ImageFormat, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "charts";

/// Largest accepted image side, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

const PARTIAL_SUFFIX: &str = "partial";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("No data to plot")]
    EmptyData,
    #[error("Failed to draw chart: {0}")]
    Render(String),
    #[error("Cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode PNG: {0}")]
    Image(#[from] image::ImageError),
}

/// Output image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 900,
        }
    }
}

impl ChartStyle {
    /// Size of the RGB pixel buffer, `None` when a side is 0 or above [`MAX_DIMENSION`].
    pub fn buffer_len(&self) -> Option<usize> {
        let valid = 1..=MAX_DIMENSION;
        if !valid.contains(&self.width) || !valid.contains(&self.height) {
            return None;
        }
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(3)
    }
}

/// Default chart file name, e.g. `covid_cases_20240110_153000.png`.
pub fn timestamped_file_name<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}_{}.png", now.format("%Y%m%d_%H%M%S"))
}

/// Removes the partially written file unless the write was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    /// Move the finished file onto `destination`.
    fn commit(mut self, destination: &Path) -> Result<(), ChartError> {
        fs::rename(&self.path, destination).map_err(|source| ChartError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Renders case charts into a fixed output directory.
pub struct ChartRenderer {
    output_dir: PathBuf,
    style: ChartStyle,
}

impl ChartRenderer {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            style: ChartStyle::default(),
        }
    }

    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn style(&self) -> ChartStyle {
        self.style
    }

    /// Create the output directory if it does not exist yet. Idempotent.
    pub fn ensure_output_dir(&self) -> Result<(), ChartError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ChartError::Io {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Render raw cases, moving average and peaks to `file_name` in the output
    /// directory and return the resolved path of the written image.
    pub fn render(
        &self,
        table: &CaseTable,
        peaks: &[Peak],
        title: &str,
        file_name: &str,
    ) -> Result<PathBuf, ChartError> {
        let data = ChartData::from_table(table, peaks, title).ok_or(ChartError::EmptyData)?;
        let ChartStyle { width, height } = self.style;
        let buffer_len = self.style.buffer_len().ok_or_else(|| {
            ChartError::Render(format!(
                "invalid image size {width}x{height}, each side must be 1..={MAX_DIMENSION}"
            ))
        })?;

        self.ensure_output_dir()?;
        let destination = self.output_dir.join(file_name);
        let partial = PartialFile::new(self.output_dir.join(format!("{file_name}.{PARTIAL_SUFFIX}")));

        let mut buffer = vec![0u8; buffer_len];
        ChartPlotter::draw(&mut buffer, (width, height), &data)
            .map_err(|e| ChartError::Render(e.to_string()))?;

        let image = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| ChartError::Render("pixel buffer does not match image size".into()))?;
        image.save_with_format(&partial.path, ImageFormat::Png)?;
        partial.commit(&destination)?;

        log::debug!(
            "wrote {}x{} chart with {} peak marker(s) to {}",
            width,
            height,
            peaks.len(),
            destination.display()
        );

        fs::canonicalize(&destination).map_err(|source| ChartError::Io {
            path: destination,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_timestamped_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 15, 30, 5).unwrap();
        assert_eq!(
            timestamped_file_name("covid_cases", &now),
            "covid_cases_20240110_153005.png"
        );
    }

    #[test]
    fn test_empty_table_touches_nothing() {
        let dir = std::env::temp_dir().join(format!("case-chart-empty-{}", std::process::id()));
        let renderer = ChartRenderer::new(&dir);

        let err = renderer
            .render(&CaseTable::default(), &[], "Empty", "empty.png")
            .unwrap_err();

        assert!(matches!(err, ChartError::EmptyData));
        assert!(!dir.exists());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let dir = std::env::temp_dir().join(format!("case-chart-zero-{}", std::process::id()));
        let renderer = ChartRenderer::new(&dir).with_style(ChartStyle {
            width: 0,
            height: 600,
        });
        let table = CaseTable::from_series(vec![(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), Some(1.0))]);

        let err = renderer.render(&table, &[], "Zero", "zero.png").unwrap_err();

        assert!(matches!(err, ChartError::Render(_)));
        assert!(!dir.join("zero.png").exists());
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let dir = std::env::temp_dir().join(format!("case-chart-huge-{}", std::process::id()));
        let renderer = ChartRenderer::new(&dir).with_style(ChartStyle {
            width: u32::MAX,
            height: u32::MAX,
        });
        let table = CaseTable::from_series(vec![(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), Some(1.0))]);

        let err = renderer.render(&table, &[], "Huge", "huge.png").unwrap_err();

        assert!(matches!(err, ChartError::Render(_)));
        assert!(!dir.exists());
    }

    #[test]
    fn test_buffer_len() {
        let style = ChartStyle {
            width: 4,
            height: 2,
        };
        assert_eq!(style.buffer_len(), Some(24));
        assert_eq!(ChartStyle::default().buffer_len(), Some(1800 * 900 * 3));
        assert_eq!(
            ChartStyle {
                width: MAX_DIMENSION + 1,
                height: 10
            }
            .buffer_len(),
            None
        );
    }

    #[test]
    fn test_partial_file_removed_on_drop() {
        let path = std::env::temp_dir().join(format!("case-chart-partial-{}.png.partial", std::process::id()));
        fs::write(&path, b"half").unwrap();
        drop(PartialFile::new(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_output_dir_is_idempotent() {
        let dir = std::env::temp_dir()
            .join(format!("case-chart-dir-{}", std::process::id()))
            .join("nested");
        let renderer = ChartRenderer::new(&dir);

        renderer.ensure_output_dir().unwrap();
        renderer.ensure_output_dir().unwrap();
        assert!(dir.is_dir());

        fs::remove_dir_all(dir.parent().unwrap()).ok();
    }
}
