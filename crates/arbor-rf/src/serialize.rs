//! Model serialization and deserialization via bincode.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope written by [`RandomForest::save`].
///
/// Borrows the forest; [`ModelEnvelope`] must keep the same field order.
#[derive(Serialize)]
struct ModelEnvelopeRef<'a> {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    forest: &'a RandomForest,
}

/// Owned counterpart of [`ModelEnvelopeRef`] read by [`RandomForest::load`].
#[derive(Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    forest: RandomForest,
}

impl RandomForest {
    /// Save the model to a binary file, replacing any existing file.
    ///
    /// Missing parent directories are created first.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::CreateModelDir`] | parent directory could not be created |
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| RfError::CreateModelDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let envelope = ModelEnvelopeRef {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            forest: self,
        };
        let bytes = bincode::serialize(&envelope).map_err(|e| RfError::SerializeModel { source: e })?;

        fs::write(path, &bytes).map_err(|e| RfError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Load a model written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();

        let bytes = fs::read(path).map_err(|e| RfError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| RfError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            classes = ?envelope.forest.class_labels.as_slice(),
            "model loaded"
        );
        Ok(envelope.forest)
    }
}
