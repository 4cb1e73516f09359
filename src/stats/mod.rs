//! Stats module - descriptive statistics and peak detection

mod calculator;

pub use calculator::{Peak, SeriesStats, StatsCalculator, StatsError, DEFAULT_THRESHOLD};
