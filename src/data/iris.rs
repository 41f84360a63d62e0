//! The bundled iris reference dataset (150 samples, 50 per species)

use crate::core::Result;
use crate::data::CsvDataset;
use std::io::Cursor;

const IRIS_CSV: &str = include_str!("../../data/iris.csv");

/// Load the bundled iris dataset
pub fn iris_dataset() -> Result<CsvDataset> {
    CsvDataset::from_reader(Cursor::new(IRIS_CSV))
}
