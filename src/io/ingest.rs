//! CSV ingest and validation.
//!
//! This module turns the three input CSVs into in-memory tables:
//!
//! - `train.csv`: `x,y1..yK` -> `SeriesTable` named `train`
//! - `ideal.csv`: `x,y1..yN` -> `SeriesTable` named `ideal`
//! - `test.csv`: `x,y` rows -> `TestPoints` (duplicate x allowed)
//!
//! Design goals:
//! - **Strict schema** for the train/ideal tables (any bad cell is a configuration error)
//! - **Row-level validation** for test rows (skip bad rows, but report what happened)
//! - **Separation of concerns**: no matching logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::{info, warn};

use crate::data::{SeriesTable, TestPoints};
use crate::domain::{RunConfig, Sample};
use crate::error::{AppError, MatchError};

/// A row-level error encountered while reading test data.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: all three tables + what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub train: SeriesTable,
    pub ideal: SeriesTable,
    pub test: TestPoints,
    pub row_errors: Vec<RowError>,
    pub test_rows_read: usize,
}

/// Load and validate all inputs named by `config`.
pub fn load_inputs(config: &RunConfig) -> Result<IngestedData, AppError> {
    let train = read_series_table(&config.train_path, "train")?;
    if config.expected_train > 0 && train.len() != config.expected_train {
        return Err(MatchError::configuration(format!(
            "training table has {} y-columns, expected {}",
            train.len(),
            config.expected_train
        ))
        .into());
    }

    let ideal = read_series_table(&config.ideal_path, "ideal")?;
    if ideal.len() < train.len() {
        warn!(
            "ideal table has fewer series ({}) than the training table ({})",
            ideal.len(),
            train.len()
        );
    }

    let file = open(&config.test_path)?;
    let parsed = parse_test_points(file)?;
    for e in &parsed.row_errors {
        warn!("{} line {}: {}", config.test_path.display(), e.line, e.message);
    }

    info!(
        "loaded {} training series, {} ideal series, {} test points",
        train.len(),
        ideal.len(),
        parsed.points.len()
    );

    Ok(IngestedData {
        train,
        ideal,
        test: parsed.points,
        row_errors: parsed.row_errors,
        test_rows_read: parsed.rows_read,
    })
}

/// Read a rectangular `x,y1..yN` CSV file as a named series table.
pub fn read_series_table(path: &Path, table: &str) -> Result<SeriesTable, AppError> {
    let file = open(path)?;
    parse_series_table(file, table).map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

/// Parse a rectangular `x,y1..yN` CSV as a named series table.
pub fn parse_series_table<R: Read>(reader: R, table: &str) -> Result<SeriesTable, MatchError> {
    let mut reader = csv_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| MatchError::configuration(format!("failed to read `{table}` headers: {e}")))?
        .clone();

    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();
    if names.first().map(String::as_str) != Some("x") {
        return Err(MatchError::configuration(format!(
            "table `{table}`: first column must be `x`"
        )));
    }
    if names.len() < 2 {
        return Err(MatchError::configuration(format!(
            "table `{table}` has no y columns"
        )));
    }

    let mut x = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len() - 1];

    for (idx, result) in reader.records().enumerate() {
        // +2 because records start after the header and CSV lines are 1-based.
        let line = idx + 2;
        let record = result
            .map_err(|e| MatchError::configuration(format!("table `{table}` line {line}: {e}")))?;

        if record.len() != names.len() {
            return Err(MatchError::configuration(format!(
                "table `{table}` line {line}: expected {} fields, found {}",
                names.len(),
                record.len()
            )));
        }

        for (col, field) in record.iter().enumerate() {
            let v = parse_f64(field).ok_or_else(|| {
                MatchError::configuration(format!(
                    "table `{table}` line {line}: invalid `{}` value '{field}'",
                    names[col]
                ))
            })?;
            if col == 0 {
                x.push(v);
            } else {
                columns[col - 1].push(v);
            }
        }
    }

    let named = names.into_iter().skip(1).zip(columns).collect();
    SeriesTable::from_columns(table, &x, named)
}

/// Parsed test rows plus the rows that were skipped.
#[derive(Debug, Clone)]
pub struct ParsedTestPoints {
    pub points: TestPoints,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Parse `x,y` test rows. Bad rows are skipped and reported; extra columns are ignored.
pub fn parse_test_points<R: Read>(reader: R) -> Result<ParsedTestPoints, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read test CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    for required in ["x", "y"] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(
                2,
                format!("Missing required column in test CSV: `{required}`"),
            ));
        }
    }

    let mut samples = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_sample(&record, &header_map) {
            Ok(s) => samples.push(s),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if samples.is_empty() && rows_read > 0 {
        return Err(AppError::new(2, "No valid test rows remain after validation."));
    }

    Ok(ParsedTestPoints {
        points: TestPoints::new(samples),
        row_errors,
        rows_read,
    })
}

fn parse_sample(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Sample, String> {
    let x = get_required(record, header_map, "x")?;
    let y = get_required(record, header_map, "y")?;
    let x = parse_f64(x).ok_or_else(|| format!("Invalid `x` value '{x}'."))?;
    let y = parse_f64(y).ok_or_else(|| format!("Invalid `y` value '{y}'."))?;
    Ok(Sample::new(x, y))
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str) -> Option<f64> {
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
