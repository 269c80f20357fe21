//! Domain types for arbor-io.

/// Feature columns fed to the model, in model input order.
pub const FEATURE_COLUMNS: [&str; 4] = ["age", "income", "years_experience", GENDER_COLUMN];

/// Column the model learns to predict.
pub const TARGET_COLUMN: &str = "target";

/// Categorical column normalized to `0`/`1` during loading.
pub const GENDER_COLUMN: &str = "gender";

/// Cell contents of one column, typed as a whole. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// Every non-missing cell parsed as a float.
    Numeric(Vec<Option<f64>>),
    /// At least one non-missing cell is not a number.
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    /// Number of cells, missing included.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of missing cells.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Return `true` for a numeric column.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnValues::Numeric(_))
    }
}

/// A named column of a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// An in-memory table loaded from CSV.
///
/// Produced by [`DatasetReader`](crate::DatasetReader). Every column holds
/// exactly `n_rows` cells and column names are unique.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    pub(crate) fn new(columns: Vec<Column>, n_rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == n_rows));
        Self { columns, n_rows }
    }

    /// Return the number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return all columns in header order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }
}
