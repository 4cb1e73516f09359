//! Charts module - Chart rendering

mod plotter;
mod renderer;

pub use plotter::{format_count, ChartData, ChartPlotter, PeakMarker};
pub use renderer::{
    timestamped_file_name, ChartError, ChartRenderer, ChartStyle, DEFAULT_OUTPUT_DIR,
    MAX_DIMENSION,
};
