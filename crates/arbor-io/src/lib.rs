//! Dataset loading, feature preparation, and report writing for arbor.

mod domain;
mod error;
mod loader;
mod prepare;
mod writer;

pub use domain::{Column, ColumnValues, Dataset, FEATURE_COLUMNS, GENDER_COLUMN, TARGET_COLUMN};
pub use error::IoError;
pub use loader::DatasetReader;
pub use prepare::{
    ColumnImputation, EncodedTarget, FeatureFrame, Imputation, PreparedData, SENTINEL, prepare,
};
pub use writer::{ClassEntry, FeatureEntry, ImputationEntry, ReportWriter, TrainingReport};
