//! CSV Data Loader Module
//! Handles CSV file loading and column extraction using Polars.

use super::table::CaseTable;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DATE_COLUMN: &str = "date";
pub const CASES_COLUMN: &str = "daily_cases";

/// Calendar-date layouts accepted in the `date` column, tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Date-time layouts whose date part is kept.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Cannot read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Unparsable date {value:?} in row {row}")]
    InvalidDate { row: usize, value: String },
    #[error("Unparsable daily case count {value:?} in row {row}")]
    InvalidCases { row: usize, value: String },
}

impl LoaderError {
    /// True when the input file itself could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoaderError::FileAccess { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Loads daily case tables from CSV files.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file and forward-fill missing case counts.
    ///
    /// The file is read completely before parsing starts.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<CaseTable, LoaderError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| LoaderError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());

        Self::parse_csv(bytes)
    }

    /// Parse CSV content with a header row into a forward-filled table.
    ///
    /// Every column is read as text and converted here, so counts are never
    /// coerced by a type guessed from the leading rows.
    pub fn parse_csv(bytes: Vec<u8>) -> Result<CaseTable, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        let mut table = Self::table_from_dataframe(&df)?;

        let filled = table.forward_fill();
        if filled > 0 {
            log::info!("forward-filled {filled} missing daily case value(s)");
        }
        let leading = table.leading_missing();
        if leading > 0 {
            log::warn!("{leading} leading record(s) have no case count to carry forward");
        }
        if !table.is_chronological() {
            log::warn!("dates are not strictly ascending, keeping input order");
        }

        Ok(table)
    }

    /// Extract the `date` and `daily_cases` columns from a DataFrame.
    pub fn table_from_dataframe(df: &DataFrame) -> Result<CaseTable, LoaderError> {
        let date_col = Self::find_column(df, DATE_COLUMN)?.cast(&DataType::String)?;
        let cases_col = Self::find_column(df, CASES_COLUMN)?.cast(&DataType::String)?;

        let dates = date_col.as_materialized_series().str()?;
        let cases = cases_col.as_materialized_series().str()?;

        let mut series = Vec::with_capacity(df.height());
        for (i, (date, value)) in dates.into_iter().zip(cases.into_iter()).enumerate() {
            // Header is line 1, so data rows start at 2.
            let row = i + 2;
            let raw = date.unwrap_or("").trim();
            let date = parse_calendar_date(raw).ok_or_else(|| LoaderError::InvalidDate {
                row,
                value: raw.to_string(),
            })?;
            let value = parse_case_count(value).map_err(|raw| LoaderError::InvalidCases {
                row,
                value: raw.to_string(),
            })?;
            series.push((date, value));
        }

        log::debug!("extracted {} records", series.len());
        Ok(CaseTable::from_series(series))
    }

    /// Find a column by name, ignoring surrounding whitespace and ASCII case.
    fn find_column<'a>(df: &'a DataFrame, name: &'static str) -> Result<&'a Column, LoaderError> {
        df.get_columns()
            .iter()
            .find(|col| col.name().trim().eq_ignore_ascii_case(name))
            .ok_or(LoaderError::MissingColumn(name))
    }
}

/// Parse a `daily_cases` cell; empty cells and `NaN` are missing values.
///
/// Returns the offending text when the cell is neither empty nor numeric.
fn parse_case_count(cell: Option<&str>) -> Result<Option<f64>, &str> {
    let raw = cell.unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(|v| Some(v).filter(|v| !v.is_nan()))
        .map_err(|_| raw)
}

/// Parse a calendar date in any of the common layouts.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
