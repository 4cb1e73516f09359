//! Statistics Calculator Module
//! Handles descriptive statistics and z-score peak detection.

use crate::data::CaseTable;
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use thiserror::Error;

/// Default number of standard deviations above the mean for a peak.
pub const DEFAULT_THRESHOLD: f64 = 1.5;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Peak threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),
}

/// Descriptive statistics over the observed case counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 when fewer than two values.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for SeriesStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            std: 0.0,
            min: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// A record flagged as significantly above the series mean.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    pub date: NaiveDate,
    pub cases: f64,
    pub z_score: f64,
}

/// Handles statistical calculations over a case table.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_series_stats(values: &[f64]) -> SeriesStats {
        let n = values.len();
        if n == 0 {
            return SeriesStats::default();
        }

        let std = if n > 1 { values.std_dev() } else { 0.0 };

        SeriesStats {
            count: n,
            mean: values.mean(),
            std,
            min: values.min(),
            max: values.max(),
        }
    }

    /// Flag every record whose count exceeds `mean + threshold * std`.
    ///
    /// Mean and standard deviation come from the current table, so they change
    /// whenever the table is filtered. Returns peaks in table order and updates
    /// `is_peak` on every record. Fewer than two observed values never yield
    /// a peak.
    pub fn detect_peaks(table: &mut CaseTable, threshold: f64) -> Result<Vec<Peak>, StatsError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(StatsError::InvalidThreshold(threshold));
        }

        let stats = Self::compute_series_stats(&table.observed_cases());
        log::debug!(
            "peak statistics: n={} mean={:.3} std={:.3}",
            stats.count,
            stats.mean,
            stats.std
        );

        let mut peaks = Vec::new();
        for record in table.records_mut() {
            record.is_peak = false;
            if stats.count < 2 {
                continue;
            }
            let Some(cases) = record.daily_cases else {
                continue;
            };
            if cases > stats.mean + threshold * stats.std {
                record.is_peak = true;
                peaks.push(Peak {
                    date: record.date,
                    cases,
                    z_score: Self::z_score(cases, &stats),
                });
            }
        }

        Ok(peaks)
    }

    /// Standard score of `value`; 0 when the series has no spread.
    pub fn z_score(value: f64, stats: &SeriesStats) -> f64 {
        if stats.std > 0.0 {
            (value - stats.mean) / stats.std
        } else {
            0.0
        }
    }
}
