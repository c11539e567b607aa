pub mod cells;
pub mod csv_frame;
pub mod discovery;
pub mod error;

pub use cells::{cell_f64, cell_i64, cell_text, date_to_days, days_to_date, format_numeric};
pub use csv_frame::{frame_from_rows, read_csv_frame};
pub use discovery::{discover_table_files, list_csv_files};
pub use error::{IngestError, Result};
