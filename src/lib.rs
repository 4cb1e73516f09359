//! Case Chart - daily case CSV analysis & chart export
//!
//! Loads a daily case series, smooths it with a trailing moving average,
//! flags z-score peaks and renders everything to a PNG chart.

pub mod charts;
pub mod data;
pub mod stats;
