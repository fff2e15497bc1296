pub mod csv;

pub use csv::{load_field_csv, read_dataset};
