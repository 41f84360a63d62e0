//! CSV dataset loader
//!
//! Supports files where:
//! - The last column is the species (name or class index)
//! - All other columns are numeric features
//! - The first row may be a header (automatically detected)
//! - Blank lines and `#` comments are skipped

use crate::core::{ClassifierError, Dataset, Result, Sample, Species};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Labeled dataset parsed from CSV text
#[derive(Debug, Clone)]
pub struct CsvDataset {
    samples: Vec<Sample>,
    dimensions: usize,
}

impl CsvDataset {
    /// Load a dataset from a CSV file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader, auto-detecting a header line
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(reader: R, auto_detect_header: bool) -> Result<Self> {
        let mut samples: Vec<Sample> = Vec::new();
        let mut dimensions = None;
        let mut first_data_line = true;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first_data_line {
                first_data_line = false;
                if auto_detect_header && Self::is_header_line(line) {
                    continue;
                }
            }

            let sample = Self::parse_data_line(line).map_err(|e| match e {
                ClassifierError::ParseError(msg) => {
                    ClassifierError::ParseError(format!("line {}: {msg}", line_no + 1))
                }
                other => other,
            })?;

            match dimensions {
                None => dimensions = Some(sample.features.len()),
                Some(dim) if dim != sample.features.len() => {
                    return Err(ClassifierError::InvalidDataset(format!(
                        "line {}: expected {dim} features, found {}",
                        line_no + 1,
                        sample.features.len()
                    )));
                }
                Some(_) => {}
            }
            samples.push(sample);
        }

        let dimensions = dimensions.ok_or(ClassifierError::EmptyDataset)?;
        Ok(CsvDataset {
            samples,
            dimensions,
        })
    }

    /// Borrow the parsed samples
    pub fn as_samples(&self) -> &[Sample] {
        &self.samples
    }

    /// A line is a header when most of its feature columns are not numbers
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 2 {
            return false;
        }

        let non_numeric = fields
            .iter()
            .take(fields.len() - 1)
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();

        non_numeric > (fields.len() - 1) / 2
    }

    fn parse_data_line(line: &str) -> Result<Sample> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            return Err(ClassifierError::ParseError(format!(
                "too few fields: {line}"
            )));
        }

        let (label_field, feature_fields) = fields.split_last().ok_or_else(|| {
            ClassifierError::ParseError(format!("too few fields: {line}"))
        })?;

        let label = label_field.parse::<Species>()?.index();
        let features = feature_fields
            .iter()
            .enumerate()
            .map(|(idx, field)| match field.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                Ok(_) => Err(ClassifierError::ParseError(format!(
                    "non-finite feature value at column {}: {field}",
                    idx + 1
                ))),
                Err(_) => Err(ClassifierError::ParseError(format!(
                    "invalid feature value at column {}: {field}",
                    idx + 1
                ))),
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Sample::new(features, label))
    }
}

impl Dataset for CsvDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn get_sample(&self, i: usize) -> Sample {
        self.samples[i].clone()
    }

    fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label).collect()
    }

    fn samples(&self) -> Vec<Sample> {
        self.samples.clone()
    }
}
