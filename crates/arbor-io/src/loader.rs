//! CSV dataset reader with schema validation and gender normalization.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::domain::{Column, ColumnValues, Dataset, FEATURE_COLUMNS, GENDER_COLUMN, TARGET_COLUMN};
use crate::IoError;

/// Cell contents treated as missing.
const MISSING_TOKENS: [&str; 19] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA", "#N/A N/A", "-1.#IND", "1.#IND", "-1.#QNAN", "1.#QNAN",
];

/// Distinct unrecognized gender values echoed in the warning.
const MAX_REPORTED_VALUES: usize = 5;

fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw)
}

/// Reads the training table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; column order is free and extra columns are kept
/// - Must contain `age`, `income`, `years_experience`, `gender`, `target`
/// - Every row has as many fields as the header
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | Path does not exist |
/// | [`IoError::OpenFile`] | File exists but cannot be opened |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Header repeats a name |
/// | [`IoError::InconsistentRowLength`] | Row field count differs from header |
/// | [`IoError::MissingColumns`] | Any required column is absent |
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    ///
    /// A header-only file yields a dataset with zero rows.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        if !self.path.exists() {
            return Err(IoError::FileNotFound {
                path: self.path.clone(),
            });
        }
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::OpenFile {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so short or long rows reach our own length check.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let names: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(IoError::DuplicateColumn {
                path: self.path.clone(),
                name: dup.clone(),
            });
        }
        self.check_required(&names)?;
        debug!(n_columns = names.len(), "read CSV header");

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != names.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: names.len(),
                    got: record.len(),
                });
            }
            for (column, raw) in cells.iter_mut().zip(record.iter()) {
                column.push((!is_missing(raw)).then(|| raw.to_string()));
            }
        }
        let n_rows = cells.first().map_or(0, Vec::len);

        let columns: Vec<Column> = names
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column {
                name,
                values: infer_column(raw),
            })
            .collect();
        let mut dataset = Dataset::new(columns, n_rows);
        normalize_gender(&mut dataset);

        info!(n_rows, n_columns = dataset.columns().len(), "dataset loaded");
        Ok(dataset)
    }

    /// Fail with every required column absent from `names`, features first.
    fn check_required(&self, names: &[String]) -> Result<(), IoError> {
        let missing: Vec<String> = FEATURE_COLUMNS
            .iter()
            .chain(std::iter::once(&TARGET_COLUMN))
            .filter(|required| !names.iter().any(|n| n == *required))
            .map(|s| (*s).to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(IoError::MissingColumns {
            path: self.path.clone(),
            missing,
        })
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

/// Parse a cell as a float, rejecting spellings of NaN.
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Type a column as numeric when every present cell parses, text otherwise.
fn infer_column(raw: Vec<Option<String>>) -> ColumnValues {
    let parsed: Option<Vec<Option<f64>>> = raw
        .iter()
        .map(|cell| match cell {
            Some(text) => parse_number(text).map(Some),
            None => Some(None),
        })
        .collect();
    match parsed {
        Some(values) => ColumnValues::Numeric(values),
        None => ColumnValues::Text(raw),
    }
}

/// Map textual `M`/`F` gender codes to `0`/`1`.
///
/// Matching ignores case and surrounding whitespace. Unrecognized values
/// become missing and are reported with a warning. A column that is already
/// numeric is left alone.
fn normalize_gender(dataset: &mut Dataset) {
    let Some(column) = dataset.column_mut(GENDER_COLUMN) else {
        return;
    };
    let ColumnValues::Text(cells) = &column.values else {
        return;
    };

    let mut unrecognized = 0usize;
    let mut examples = BTreeSet::new();
    let mapped: Vec<Option<f64>> = cells
        .iter()
        .map(|cell| {
            let raw = cell.as_deref()?;
            match raw.trim().to_uppercase().as_str() {
                "M" => Some(0.0),
                "F" => Some(1.0),
                _ => {
                    unrecognized += 1;
                    if examples.len() < MAX_REPORTED_VALUES {
                        examples.insert(raw.to_string());
                    }
                    None
                }
            }
        })
        .collect();

    if unrecognized > 0 {
        warn!(
            count = unrecognized,
            values = ?examples,
            "unrecognized gender values treated as missing"
        );
    }
    debug!(n_rows = mapped.len(), "gender column normalized");
    column.values = ColumnValues::Numeric(mapped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn numeric<'a>(ds: &'a Dataset, name: &str) -> &'a [Option<f64>] {
        match &ds.column(name).unwrap().values {
            ColumnValues::Numeric(v) => v,
            ColumnValues::Text(_) => panic!("{name} should be numeric"),
        }
    }

    #[test]
    fn read_valid_dataset() {
        let csv = "age,income,years_experience,gender,target,notes\n\
                   30,50000,5,M,0,hello\n\
                   45,,20,f,1,\n\
                   NA,72000.5,12,F,1,world\n";
        let f = write_csv(csv);
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.columns().len(), 6);
        assert_eq!(numeric(&ds, "age"), &[Some(30.0), Some(45.0), None]);
        assert_eq!(numeric(&ds, "income"), &[Some(50000.0), None, Some(72000.5)]);
        assert_eq!(numeric(&ds, "gender"), &[Some(0.0), Some(1.0), Some(1.0)]);
        assert!(matches!(ds.column("notes").unwrap().values, ColumnValues::Text(_)));
    }

    #[test]
    fn gender_mapping_ignores_case_and_whitespace() {
        let csv = "age,income,years_experience,gender,target\n\
                   1,1,1, m ,0\n1,1,1,F,1\n1,1,1,x,0\n1,1,1,,1\n1,1,1,Female,0\n";
        let f = write_csv(csv);
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(numeric(&ds, "gender"), &[Some(0.0), Some(1.0), None, None, None]);
    }

    #[test]
    fn numeric_gender_left_untouched() {
        let csv = "age,income,years_experience,gender,target\n1,1,1,0,0\n1,1,1,1,1\n";
        let f = write_csv(csv);
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(numeric(&ds, "gender"), &[Some(0.0), Some(1.0)]);
    }

    #[test]
    fn missing_tokens_are_missing() {
        let csv = "age,income,years_experience,gender,target\n\
                   NaN,NULL,#N/A,M,0\nn/a,None,<NA>,F,1\n";
        let f = write_csv(csv);
        let ds = DatasetReader::new(f.path()).read().unwrap();
        for name in ["age", "income", "years_experience"] {
            assert_eq!(numeric(&ds, name), &[None, None], "column {name}");
        }
    }

    #[test]
    fn header_only_file_has_zero_rows() {
        let f = write_csv("age,income,years_experience,gender,target\n");
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_rows(), 0);
        assert!(ds.column("target").unwrap().values.is_numeric());
    }

    #[test]
    fn missing_file_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = DatasetReader::new(&dir.path().join("absent.csv")).read().unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn missing_columns_lists_all_in_order() {
        let f = write_csv("gender,age,notes\nM,30,x\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        match err {
            IoError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["income", "years_experience", "target"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_column_error() {
        let f = write_csv("age,income,years_experience,gender,target,age\n1,1,1,M,0,2\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { ref name, .. } if name == "age"));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("age,income,years_experience,gender,target\n1,1,1,M,0\n1,1,M,0\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { row_index: 1, expected: 5, got: 4, .. }
        ));
    }

    #[test]
    fn text_feature_column_stays_text() {
        let f = write_csv("age,income,years_experience,gender,target\n30,high,1,M,0\n31,,2,F,1\n");
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(
            ds.column("income").unwrap().values,
            ColumnValues::Text(vec![Some("high".into()), None])
        );
    }
}
