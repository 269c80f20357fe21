use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// An empty node has zero impurity.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let proportions = class_counts.iter().filter(|&&c| c > 0).map(|&c| c as f64 / n);
        let value = match self {
            SplitCriterion::Gini => 1.0 - proportions.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -proportions.map(|p| p * p.ln()).sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Inputs shared by every split search within one tree.
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
pub(crate) struct SplitContext<'a> {
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n * parent - n_left * left - n_right * right`, the MDI numerator.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

impl SplitContext<'_> {
    /// Find the best threshold split for the samples in `sample_indices`.
    ///
    /// Features are visited in a random order without replacement. Constant
    /// features do not count toward `max_features`, so the search keeps
    /// drawing until `max_features` informative features were scanned or
    /// every feature was tried.
    ///
    /// Returns `None` when no split satisfies `min_samples_leaf` or every
    /// candidate feature is constant within the node.
    pub(crate) fn find_best_split(
        &self,
        sample_indices: &[usize],
        parent_counts: &[usize],
        parent_impurity: Impurity,
        rng: &mut impl Rng,
    ) -> Option<SplitResult> {
        let n_features = self.features.len();
        let n_samples = sample_indices.len();
        if n_samples < 2 * self.min_samples_leaf || n_features == 0 {
            return None;
        }

        let mut feature_order: Vec<usize> = (0..n_features).collect();
        let mut visited_informative = 0usize;
        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

        for drawn in 0..n_features {
            if visited_informative >= self.max_features {
                break;
            }
            let pick = rng.gen_range(drawn..n_features);
            feature_order.swap(drawn, pick);
            let feat_idx = feature_order[drawn];
            let column = &self.features[feat_idx];

            sorted.clear();
            sorted.extend(sample_indices.iter().map(|&si| (column[si], si)));
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
            if sorted[0].0 == sorted[n_samples - 1].0 {
                continue;
            }
            visited_informative += 1;

            if let Some((threshold, decrease)) =
                self.scan_feature(&sorted, parent_counts, parent_impurity)
                && best.is_none_or(|(_, _, d)| decrease > d)
            {
                best = Some((feat_idx, threshold, decrease));
            }
        }

        let (feat_idx, threshold, impurity_decrease) = best?;
        let column = &self.features[feat_idx];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
            .iter()
            .partition(|&&si| column[si] <= threshold);

        Some(SplitResult {
            feature: FeatureIndex::new(feat_idx),
            threshold,
            impurity_decrease,
            left_indices,
            right_indices,
        })
    }

    /// Sweep one sorted feature column and return its best `(threshold, decrease)`.
    fn scan_feature(
        &self,
        sorted: &[(f64, usize)],
        parent_counts: &[usize],
        parent_impurity: Impurity,
    ) -> Option<(f64, f64)> {
        let n_samples = sorted.len();
        let weighted_parent = n_samples as f64 * parent_impurity.value();
        let mut left_counts = vec![0usize; self.n_classes];
        let mut right_counts = parent_counts.to_vec();
        let mut best: Option<(f64, f64)> = None;

        for pos in 0..n_samples - 1 {
            let (value, si) = sorted[pos];
            let class = self.labels[si];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let next_value = sorted[pos + 1].0;
            if value == next_value {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n_samples - n_left;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let left = self.criterion.impurity(&left_counts, n_left).value();
            let right = self.criterion.impurity(&right_counts, n_right).value();
            let decrease = weighted_parent - n_left as f64 * left - n_right as f64 * right;

            if best.is_none_or(|(_, d)| decrease > d) {
                let mut threshold = value + (next_value - value) / 2.0;
                if threshold >= next_value {
                    threshold = value;
                }
                best = Some((threshold, decrease));
            }
        }
        best
    }
}
