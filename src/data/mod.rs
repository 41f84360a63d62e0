//! Dataset loading
//!
//! CSV parsing for user-supplied data plus the bundled iris reference set.

pub mod csv;
pub mod iris;

pub use self::csv::CsvDataset;
pub use self::iris::iris_dataset;
