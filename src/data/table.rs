//! Case Table Module
//! In-memory representation of the daily case series.

use chrono::NaiveDate;

/// A single day of the series.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub date: NaiveDate,
    /// `None` when the input cell was empty and nothing could be carried forward.
    pub daily_cases: Option<f64>,
    pub moving_avg: Option<f64>,
    pub is_peak: bool,
}

impl CaseRecord {
    pub fn new(date: NaiveDate, daily_cases: Option<f64>) -> Self {
        Self {
            date,
            daily_cases,
            moving_avg: None,
            is_peak: false,
        }
    }
}

/// Ordered sequence of case records, mutated in place by each pipeline stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseTable {
    records: Vec<CaseRecord>,
    moving_avg_window: Option<usize>,
}

impl CaseTable {
    pub fn new(records: Vec<CaseRecord>) -> Self {
        Self {
            records,
            moving_avg_window: None,
        }
    }

    /// Build a table from `(date, daily_cases)` pairs.
    pub fn from_series<I>(series: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        Self::new(
            series
                .into_iter()
                .map(|(date, cases)| CaseRecord::new(date, cases))
                .collect(),
        )
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [CaseRecord] {
        &mut self.records
    }

    /// Keep only the records matching `keep`, preserving order.
    pub(crate) fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&CaseRecord) -> bool,
    {
        self.records.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Window size of the moving average column, if it has been computed.
    pub fn moving_avg_window(&self) -> Option<usize> {
        self.moving_avg_window
    }

    pub fn has_moving_average(&self) -> bool {
        self.moving_avg_window.is_some()
    }

    pub(crate) fn set_moving_avg_window(&mut self, window: usize) {
        self.moving_avg_window = Some(window);
    }

    /// Replace every missing `daily_cases` with the most recent prior observed value.
    ///
    /// Records before the first observation stay missing. Returns the number of
    /// records that were filled.
    pub fn forward_fill(&mut self) -> usize {
        let mut last_seen: Option<f64> = None;
        let mut filled = 0;

        for record in &mut self.records {
            match record.daily_cases {
                Some(value) => last_seen = Some(value),
                None => {
                    if let Some(value) = last_seen {
                        record.daily_cases = Some(value);
                        filled += 1;
                    }
                }
            }
        }

        filled
    }

    /// Number of records at the head of the table with no observed value.
    pub fn leading_missing(&self) -> usize {
        self.records
            .iter()
            .take_while(|r| r.daily_cases.is_none())
            .count()
    }

    /// Observed `daily_cases` values in table order, skipping missing ones.
    pub fn observed_cases(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.daily_cases).collect()
    }

    /// First and last date in table order.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some((first.date, last.date))
    }

    /// True when every date is strictly later than the previous one.
    pub fn is_chronological(&self) -> bool {
        self.records.windows(2).all(|w| w[0].date < w[1].date)
    }
}
