//! JSON training report writer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::prepare::{ColumnImputation, Imputation};
use crate::IoError;

/// Summary of one training run, serialized as pretty JSON.
///
/// Built from primitives so this crate stays independent of the model crate.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub n_trees: usize,
    pub seed: u64,
    pub test_size: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub stratified: bool,
    pub accuracy: f64,
    /// Labels of the confusion matrix rows and columns, ascending.
    pub matrix_labels: Vec<String>,
    /// `confusion_matrix[actual][predicted]`.
    pub confusion_matrix: Vec<Vec<usize>>,
    pub class_metrics: Vec<ClassEntry>,
    pub feature_importances: Vec<FeatureEntry>,
    pub imputations: Vec<ImputationEntry>,
}

/// Per-class precision, recall and F1.
#[derive(Debug, Clone, Serialize)]
pub struct ClassEntry {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// A feature's mean-decrease-in-impurity share and rank.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureEntry {
    pub name: String,
    pub importance: f64,
    pub rank: usize,
}

/// How one feature column was imputed.
#[derive(Debug, Clone, Serialize)]
pub struct ImputationEntry {
    pub column: String,
    /// `"none"`, `"median"` or `"sentinel"`.
    pub strategy: &'static str,
    /// Fill value, absent when nothing was filled.
    pub value: Option<f64>,
    pub n_filled: usize,
}

impl From<&ColumnImputation> for ImputationEntry {
    fn from(imputation: &ColumnImputation) -> Self {
        let (strategy, value) = match imputation.imputation {
            Imputation::None => ("none", None),
            Imputation::Median(v) => ("median", Some(v)),
            Imputation::Sentinel => ("sentinel", Some(crate::prepare::SENTINEL)),
        };
        Self {
            column: imputation.column.clone(),
            strategy,
            value,
            n_filled: imputation.n_filled,
        }
    }
}

/// Writes a [`TrainingReport`] to a single JSON file.
///
/// Creates the parent directory on construction if it does not exist.
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    /// Create a writer targeting `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the parent directory cannot be created.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn new(path: &Path) -> Result<Self, IoError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| IoError::OutputDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
            debug!("output directory ready");
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Write the report, replacing any existing file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | File write failed |
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write(&self, report: &TrainingReport) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(report).map_err(|e| IoError::SerializeReport {
            path: self.path.clone(),
            source: e,
        })?;
        fs::write(&self.path, &json).map_err(|e| IoError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;

        info!(accuracy = report.accuracy, "training report written");
        Ok(())
    }

    /// Return the destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
