//! Confusion matrix and per-class classification metrics.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::RfError;

/// A confusion matrix over the classes observed in an evaluation.
///
/// Rows are actual classes, columns predicted classes, both ordered by
/// ascending class index. Only classes that occur among the actual or
/// predicted labels get a row and column, so every entry sums to the number
/// of evaluated samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    classes: Vec<usize>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// TP / (TP + FP); 0.0 if the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 if the class never occurs.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 if both are zero.
    pub f1: f64,
    /// Number of actual samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from actual and predicted class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::LabelCountMismatch`] | Slices differ in length |
    pub fn from_labels(actual: &[usize], predicted: &[usize]) -> Result<Self, RfError> {
        if actual.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if actual.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_features_rows: actual.len(),
                n_labels: predicted.len(),
            });
        }
        let classes: Vec<usize> = actual
            .iter()
            .chain(predicted)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position = |class: usize| classes.binary_search(&class).unwrap_or_default();

        let mut matrix = vec![vec![0usize; classes.len()]; classes.len()];
        for (&a, &p) in actual.iter().zip(predicted) {
            matrix[position(a)][position(p)] += 1;
        }
        Ok(Self { matrix, classes })
    }

    /// Proportion of samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.classes.len()).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Total number of evaluated samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Per-class precision, recall, F1, and support, in class order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.classes.len();
        (0..n)
            .map(|i| {
                let tp = self.matrix[i][i];
                let predicted: usize = (0..n).map(|r| self.matrix[r][i]).sum();
                let support: usize = self.matrix[i].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.classes[i],
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the matrix rows (actual class per row).
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the class index of each row/column.
    #[must_use]
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    /// Return the number of rows (equivalently, columns).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Renders the nested-list form, e.g. `[[9, 1], [0, 10]]`.
impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, row) in self.matrix.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str("[")?;
            for (j, count) in row.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{count}")?;
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_confusion_matrix() {
        let actual = [0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = [0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted).unwrap();

        assert_eq!(cm.as_rows(), &[vec![2, 1, 0], vec![0, 2, 1], vec![1, 0, 2]]);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
    }

    #[test]
    fn only_observed_classes_get_rows() {
        // Class 1 never appears; classes 0 and 3 do.
        let cm = ConfusionMatrix::from_labels(&[0, 3, 3], &[0, 3, 0]).unwrap();
        assert_eq!(cm.classes(), &[0, 3]);
        assert_eq!(cm.as_rows(), &[vec![1, 0], vec![1, 1]]);
        assert_eq!(cm.total(), 3);
    }

    #[test]
    fn predicted_only_class_is_included() {
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[0, 1]).unwrap();
        assert_eq!(cm.n_classes(), 2);
        assert_eq!(cm.as_rows(), &[vec![1, 1], vec![0, 0]]);
        let metrics = cm.class_metrics();
        assert_eq!(metrics[1].support, 0);
        assert_eq!(metrics[1].recall, 0.0);
    }

    #[test]
    fn single_class_is_one_by_one() {
        let cm = ConfusionMatrix::from_labels(&[2, 2, 2, 2], &[2, 2, 2, 2]).unwrap();
        assert_eq!(cm.as_rows(), &[vec![4]]);
        assert_eq!(cm.to_string(), "[[4]]");
    }

    #[test]
    fn display_is_nested_list() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1], &[0, 1, 1, 1]).unwrap();
        assert_eq!(cm.to_string(), "[[1, 1], [0, 2]]");
    }

    #[test]
    fn empty_and_mismatched_inputs() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[]),
            Err(RfError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0]),
            Err(RfError::LabelCountMismatch { .. })
        ));
    }
}
