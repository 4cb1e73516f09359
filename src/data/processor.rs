//! Data Processor Module
//! Handles date-window filtering and the trailing moving average.

use super::table::CaseTable;
use chrono::NaiveDate;
use thiserror::Error;

/// Default trailing window for the moving average, in records.
pub const DEFAULT_WINDOW: usize = 7;

/// Layout required for date-range bounds.
pub const BOUND_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Incorrect date format for {name}: {value:?}, should be YYYY-MM-DD")]
    InvalidDateBound { name: &'static str, value: String },
    #[error("Moving average window must be a positive integer")]
    InvalidWindow,
}

/// Check that a date-range bound is a well-formed `YYYY-MM-DD` calendar date.
pub fn validate_date_bound(name: &'static str, value: &str) -> Result<NaiveDate, ProcessorError> {
    let invalid = || ProcessorError::InvalidDateBound {
        name,
        value: value.to_string(),
    };

    // chrono accepts unpadded fields, the bound format does not.
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, BOUND_FORMAT).map_err(|_| invalid())
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Restrict the table to `start <= date <= end`, both bounds inclusive.
    ///
    /// Both bounds are validated before the table is touched. Without bounds
    /// the table is left as is; `start > end` leaves it empty.
    pub fn filter_by_date_range(
        table: &mut CaseTable,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<(), ProcessorError> {
        let start = start.map(|s| validate_date_bound("start_date", s)).transpose()?;
        let end = end.map(|s| validate_date_bound("end_date", s)).transpose()?;

        if start.is_none() && end.is_none() {
            return Ok(());
        }

        let before = table.len();
        table.retain(|record| {
            start.map_or(true, |s| record.date >= s) && end.map_or(true, |e| record.date <= e)
        });
        log::debug!(
            "date filter {:?}..={:?} kept {} of {} records",
            start,
            end,
            table.len(),
            before
        );

        Ok(())
    }

    /// Attach the trailing moving average of `daily_cases` to every record.
    ///
    /// The window shrinks at the start of the series. Missing values are skipped
    /// inside a window; a window with no observed value yields `None`.
    pub fn compute_moving_average(table: &mut CaseTable, window: usize) -> Result<(), ProcessorError> {
        if window == 0 {
            return Err(ProcessorError::InvalidWindow);
        }

        let averages = Self::rolling_mean(
            &table
                .records()
                .iter()
                .map(|r| r.daily_cases)
                .collect::<Vec<_>>(),
            window,
        );

        for (record, avg) in table.records_mut().iter_mut().zip(averages) {
            record.moving_avg = avg;
        }
        table.set_moving_avg_window(window);

        Ok(())
    }

    /// Trailing mean over `values` with a minimum of one observed sample.
    ///
    /// Each window is summed on its own so large values never leak into later
    /// windows through cancellation.
    pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
        (0..values.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(window);
                let (sum, count) = values[start..=i]
                    .iter()
                    .flatten()
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                (count > 0).then(|| sum / count as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample_table() -> CaseTable {
        CaseTable::from_series((1..=10).map(|d| (day(d), Some(d as f64))))
    }

    fn dates(table: &CaseTable) -> Vec<NaiveDate> {
        table.records().iter().map(|r| r.date).collect()
    }

    #[test]
    fn test_validate_date_bound() {
        assert_eq!(validate_date_bound("start_date", "2024-01-05").unwrap(), day(5));
        for bad in ["2024-1-5", "2024/01/05", "2024-13-01", "05-01-2024", "", "2024-01-05 "] {
            let err = validate_date_bound("start_date", bad).unwrap_err();
            assert!(err.to_string().contains("start_date"), "{bad}");
        }
    }

    #[test]
    fn test_filter_inclusive_bounds() {
        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, Some("2024-01-03"), Some("2024-01-05")).unwrap();
        assert_eq!(dates(&table), vec![day(3), day(4), day(5)]);
    }

    #[test]
    fn test_filter_single_bound() {
        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, None, Some("2024-01-02")).unwrap();
        assert_eq!(dates(&table), vec![day(1), day(2)]);

        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, Some("2024-01-09"), None).unwrap();
        assert_eq!(dates(&table), vec![day(9), day(10)]);
    }

    #[test]
    fn test_filter_without_bounds_is_noop() {
        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, None, None).unwrap();
        assert_eq!(table, sample_table());
    }

    #[test]
    fn test_filter_same_day() {
        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, Some("2024-01-04"), Some("2024-01-04")).unwrap();
        assert_eq!(dates(&table), vec![day(4)]);

        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, Some("2024-02-04"), Some("2024-02-04")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_filter_reversed_range_is_empty() {
        let mut table = sample_table();
        DataProcessor::filter_by_date_range(&mut table, Some("2024-01-08"), Some("2024-01-02")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_filter_invalid_bound_leaves_table() {
        let mut table = sample_table();
        let err = DataProcessor::filter_by_date_range(&mut table, Some("2024-01-02"), Some("Jan 5"))
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidDateBound { name: "end_date", .. }));
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn test_moving_average_shrinking_window() {
        let mut table = sample_table();
        DataProcessor::compute_moving_average(&mut table, 3).unwrap();

        let avgs: Vec<f64> = table.records().iter().map(|r| r.moving_avg.unwrap()).collect();
        assert_eq!(avgs.len(), 10);
        assert_eq!(avgs[0], 1.0);
        assert_eq!(avgs[1], 1.5);
        assert_eq!(avgs[2], 2.0);
        assert_eq!(avgs[9], 9.0);
        assert_eq!(table.moving_avg_window(), Some(3));
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let mut table = sample_table();
        DataProcessor::compute_moving_average(&mut table, 1).unwrap();
        for record in table.records() {
            assert_eq!(record.moving_avg, record.daily_cases);
        }
    }

    #[test]
    fn test_moving_average_skips_missing() {
        let values = [None, None, Some(4.0), Some(6.0), None, None, None];
        let avgs = DataProcessor::rolling_mean(&values, 2);
        assert_eq!(
            avgs,
            vec![None, None, Some(4.0), Some(5.0), Some(6.0), None, None]
        );
    }

    #[test]
    fn test_moving_average_keeps_precision_after_large_values() {
        let values = [Some(1e16), Some(1.0), Some(2.0)];
        assert_eq!(
            DataProcessor::rolling_mean(&values, 1),
            vec![Some(1e16), Some(1.0), Some(2.0)]
        );
        assert_eq!(DataProcessor::rolling_mean(&values, 2)[2], Some(1.5));
    }

    #[test]
    fn test_moving_average_rejects_zero_window() {
        let mut table = sample_table();
        let err = DataProcessor::compute_moving_average(&mut table, 0).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidWindow));
        assert!(!table.has_moving_average());
    }
}
