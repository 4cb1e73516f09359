//! Data module - CSV loading and processing

mod loader;
mod processor;
mod table;

pub use loader::{parse_calendar_date, DataLoader, LoaderError, CASES_COLUMN, DATE_COLUMN};
pub use processor::{validate_date_bound, DataProcessor, ProcessorError, DEFAULT_WINDOW};
pub use table::{CaseRecord, CaseTable};
