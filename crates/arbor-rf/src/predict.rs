//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::labels::ClassLabels;

/// Class probability distribution averaged over the ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Return the most probable class; ties resolve to the lowest index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (class, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = class;
            }
        }
        best
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class index for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_label(&self, sample: &[f64]) -> Result<&str, RfError> {
        let class = self.predict(sample)?;
        // with_class_labels guarantees a label for every class index.
        Ok(self.class_labels.get(class).unwrap_or_default())
    }

    /// Average the leaf distributions of every tree for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut probs = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in probs.iter_mut().zip(tree.predict_proba(sample)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|v| *v /= n);
        Ok(ClassDistribution { probs })
    }

    /// Predict class indices for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the class labels.
    #[must_use]
    pub fn class_labels(&self) -> &ClassLabels {
        &self.class_labels
    }
}

#[cfg(test)]
mod tests {
    use super::ClassDistribution;

    #[test]
    fn predicted_class_is_argmax() {
        let dist = ClassDistribution {
            probs: vec![0.2, 0.5, 0.3],
        };
        assert_eq!(dist.predicted_class(), 1);
    }

    #[test]
    fn tie_goes_to_lowest_class() {
        let dist = ClassDistribution {
            probs: vec![0.4, 0.4, 0.2],
        };
        assert_eq!(dist.predicted_class(), 0);
    }
}
