//! Feature selection, missing-value imputation, and target encoding.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, instrument};

use crate::domain::{Column, ColumnValues, Dataset, FEATURE_COLUMNS, TARGET_COLUMN};
use crate::IoError;

/// Placeholder written into missing cells of non-numeric feature columns.
pub const SENTINEL: f64 = -1.0;

const SENTINEL_TEXT: &str = "-1";

/// How the missing cells of one feature column were filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imputation {
    /// Column had no missing cells.
    None,
    /// Numeric column filled with its median.
    Median(f64),
    /// Non-numeric column filled with [`SENTINEL`].
    Sentinel,
}

impl fmt::Display for Imputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imputation::None => f.write_str("none"),
            Imputation::Median(v) => write!(f, "median({v})"),
            Imputation::Sentinel => write!(f, "sentinel({SENTINEL})"),
        }
    }
}

/// Imputation applied to one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnImputation {
    pub column: String,
    pub imputation: Imputation,
    /// Number of cells that were missing and got filled.
    pub n_filled: usize,
}

/// The imputed feature columns, in model input order.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    columns: Vec<Column>,
    imputations: Vec<ColumnImputation>,
    n_rows: usize,
}

/// Target labels encoded as class indices.
///
/// `classes[labels[i]]` is the original label of row `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTarget {
    pub labels: Vec<usize>,
    /// Distinct labels in ascending order.
    pub classes: Vec<String>,
}

/// Model-ready features and target.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub features: FeatureFrame,
    pub target: EncodedTarget,
}

/// Select the feature columns, fill their gaps, and encode the target.
///
/// Numeric columns take the median of their observed values; non-numeric
/// columns take [`SENTINEL`]. Columns without gaps pass through unchanged.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::ColumnNotFound`] | A feature or the target column is absent |
/// | [`IoError::NoObservedValues`] | A numeric feature column is entirely missing |
/// | [`IoError::MissingTarget`] | A row has no target value |
#[instrument(skip_all, fields(n_rows = dataset.n_rows()))]
pub fn prepare(dataset: &Dataset) -> Result<PreparedData, IoError> {
    let mut columns = Vec::with_capacity(FEATURE_COLUMNS.len());
    let mut imputations = Vec::with_capacity(FEATURE_COLUMNS.len());
    for name in FEATURE_COLUMNS {
        let column = required(dataset, name)?;
        let (values, imputation, n_filled) = impute(name, &column.values)?;
        if n_filled > 0 {
            debug!(column = name, n_filled, %imputation, "imputed missing values");
        }
        imputations.push(ColumnImputation {
            column: name.to_string(),
            imputation,
            n_filled,
        });
        columns.push(Column {
            name: name.to_string(),
            values,
        });
    }

    let target = encode_target(&required(dataset, TARGET_COLUMN)?.values)?;
    let n_filled: usize = imputations.iter().map(|i| i.n_filled).sum();
    info!(
        n_rows = dataset.n_rows(),
        n_features = columns.len(),
        n_classes = target.classes.len(),
        n_filled,
        "features prepared"
    );

    Ok(PreparedData {
        features: FeatureFrame {
            columns,
            imputations,
            n_rows: dataset.n_rows(),
        },
        target,
    })
}

fn required<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, IoError> {
    dataset.column(name).ok_or_else(|| IoError::ColumnNotFound {
        column: name.to_string(),
    })
}

/// Median of the non-missing values; mean of the middle pair for even counts.
fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(f64::total_cmp);
    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        Some((observed[mid - 1] + observed[mid]) / 2.0)
    } else {
        Some(observed[mid])
    }
}

fn impute(name: &str, values: &ColumnValues) -> Result<(ColumnValues, Imputation, usize), IoError> {
    let n_missing = values.n_missing();
    if n_missing == 0 {
        return Ok((values.clone(), Imputation::None, 0));
    }
    match values {
        ColumnValues::Numeric(cells) => {
            let fill = median(cells).ok_or_else(|| IoError::NoObservedValues {
                column: name.to_string(),
            })?;
            let filled = cells.iter().map(|c| Some(c.unwrap_or(fill))).collect();
            Ok((ColumnValues::Numeric(filled), Imputation::Median(fill), n_missing))
        }
        ColumnValues::Text(cells) => {
            let filled = cells
                .iter()
                .map(|c| Some(c.clone().unwrap_or_else(|| SENTINEL_TEXT.to_string())))
                .collect();
            Ok((ColumnValues::Text(filled), Imputation::Sentinel, n_missing))
        }
    }
}

/// Map distinct target labels, sorted ascending, to `0..n_classes`.
fn encode_target(values: &ColumnValues) -> Result<EncodedTarget, IoError> {
    let missing = |row_index| IoError::MissingTarget {
        column: TARGET_COLUMN.to_string(),
        row_index,
    };
    match values {
        ColumnValues::Numeric(cells) => {
            let observed: Vec<f64> = cells
                .iter()
                .enumerate()
                .map(|(row, c)| c.ok_or_else(|| missing(row)))
                .collect::<Result<_, _>>()?;
            let mut distinct = observed.clone();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            let labels = observed
                .iter()
                .map(|v| distinct.partition_point(|d| d < v))
                .collect();
            let classes = distinct.iter().map(|v| v.to_string()).collect();
            Ok(EncodedTarget { labels, classes })
        }
        ColumnValues::Text(cells) => {
            let observed: Vec<&str> = cells
                .iter()
                .enumerate()
                .map(|(row, c)| c.as_deref().ok_or_else(|| missing(row)))
                .collect::<Result<_, _>>()?;
            let distinct: Vec<&str> = observed.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
            let labels = observed
                .iter()
                .map(|v| distinct.partition_point(|d| d < v))
                .collect();
            let classes = distinct.iter().map(|s| (*s).to_string()).collect();
            Ok(EncodedTarget { labels, classes })
        }
    }
}

/// Parse a feature cell, accepting the sentinel text.
fn parse_cell(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl FeatureFrame {
    /// Convert to the row-major matrix the forest consumes.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NonNumericFeature`] for a text cell that is neither
    /// a number nor the sentinel.
    pub fn to_rows(&self) -> Result<Vec<Vec<f64>>, IoError> {
        let mut rows = vec![Vec::with_capacity(self.columns.len()); self.n_rows];
        for column in &self.columns {
            match &column.values {
                ColumnValues::Numeric(cells) => {
                    for (row, cell) in rows.iter_mut().zip(cells) {
                        // Imputation leaves no gaps; an untouched column has none either.
                        row.push(cell.unwrap_or(SENTINEL));
                    }
                }
                ColumnValues::Text(cells) => {
                    for (row_index, (row, cell)) in rows.iter_mut().zip(cells).enumerate() {
                        let raw = cell.as_deref().unwrap_or(SENTINEL_TEXT);
                        let value = parse_cell(raw).ok_or_else(|| IoError::NonNumericFeature {
                            column: column.name.clone(),
                            row_index,
                            raw: raw.to_string(),
                        })?;
                        row.push(value);
                    }
                }
            }
        }
        Ok(rows)
    }

    /// Return the feature names in column order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Return the imputed columns.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Return what was filled in each column.
    #[must_use]
    pub fn imputations(&self) -> &[ColumnImputation] {
        &self.imputations
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}
