//! I/O error types for arbor-io.

use std::path::PathBuf;

/// Errors from dataset loading, feature preparation, and report writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist. Checked before parsing.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
    },

    /// Returned when the input file exists but cannot be opened.
    #[error("cannot open {path}")]
    OpenFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a data row has a different number of fields than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} fields, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Number of header fields.
        expected: usize,
        /// Number of fields in this row.
        got: usize,
    },

    /// Returned when two header fields share a name.
    #[error("duplicate column \"{name}\" in {path}")]
    DuplicateColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The repeated column name.
        name: String,
    },

    /// Returned when required columns are absent from the header.
    ///
    /// Lists every missing column, in required order.
    #[error("missing columns in {path}: {missing:?}")]
    MissingColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Names of the absent columns.
        missing: Vec<String>,
    },

    /// Returned when a dataset handed to preparation lacks a required column.
    #[error("dataset has no column \"{column}\"")]
    ColumnNotFound {
        /// The absent column.
        column: String,
    },

    /// Returned when a numeric feature column has no non-missing cell to take a median of.
    #[error("column \"{column}\" has no observed values to impute from")]
    NoObservedValues {
        /// The empty column.
        column: String,
    },

    /// Returned when a text feature cell cannot be used as a model input.
    #[error("non-numeric value \"{raw}\" in feature column \"{column}\" at row {row_index}")]
    NonNumericFeature {
        /// Feature column name.
        column: String,
        /// Zero-based row index.
        row_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the target cell of a row is missing.
    #[error("missing target value in column \"{column}\" at row {row_index}")]
    MissingTarget {
        /// Target column name.
        column: String,
        /// Zero-based row index.
        row_index: usize,
    },

    /// Returned when the report's parent directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the report cannot be encoded as JSON.
    #[error("cannot serialize report for {path}")]
    SerializeReport {
        /// Destination path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
