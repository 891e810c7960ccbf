pub mod csv_reader;

pub use csv_reader::{load_sales, parse_amount, resolve_columns, ColumnIndex, LoadOptions};
