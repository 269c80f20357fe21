use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::RfError;
use crate::node::{Node, NodeIndex};
use crate::split::{SplitContext, SplitCriterion};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features considered at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the width of leaf distributions.
    ///
    /// Bootstrap samples may miss the highest class; the forest passes its own
    /// class count so every tree votes over the same classes.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed for feature sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a decision tree on a row-major dataset.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `features` is empty |
    /// | [`RfError::ZeroFeatures`] | rows have zero columns |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`RfError::LabelCountMismatch`] | `labels.len() != features.len()` |
    /// | [`RfError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    /// | [`RfError::InvalidMaxFeatures`] | `max_features` outside [1, n_features] |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let n_features = validate_training_data(features, labels)?;
        self.validate(n_features)?;

        let n_classes = self
            .n_classes
            .unwrap_or(0)
            .max(labels.iter().max().map_or(0, |&m| m + 1));
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let builder = TreeBuilder {
            config: self,
            ctx: SplitContext {
                features: &columns,
                labels,
                n_classes,
                criterion: self.criterion,
                max_features: self.max_features.unwrap_or(n_features),
                min_samples_leaf: self.min_samples_leaf,
            },
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut nodes = Vec::new();
        let all: Vec<usize> = (0..features.len()).collect();
        builder.grow(&all, 0, &mut rng, &mut nodes);

        debug!(n_nodes = nodes.len(), n_classes, "decision tree built");

        Ok(DecisionTree {
            nodes,
            n_features,
            n_classes,
        })
    }

    fn validate(&self, n_features: usize) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check shape and finiteness of a row-major training set.
///
/// Returns the number of feature columns.
pub(crate) fn validate_training_data(
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<usize, RfError> {
    let first = features.first().ok_or(RfError::EmptyDataset)?;
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_features_rows: features.len(),
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

struct TreeBuilder<'a> {
    config: &'a DecisionTreeConfig,
    ctx: SplitContext<'a>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `samples` and return the index of its root.
    ///
    /// A split node is reserved before its children are grown so the root of
    /// every subtree precedes its descendants in the arena.
    fn grow(
        &self,
        samples: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        nodes: &mut Vec<Node>,
    ) -> NodeIndex {
        let mut counts = vec![0usize; self.ctx.n_classes];
        for &si in samples {
            counts[self.ctx.labels[si]] += 1;
        }
        let impurity = self.ctx.criterion.impurity(&counts, samples.len());
        let slot = NodeIndex::new(nodes.len());
        nodes.push(Node::leaf(&counts, impurity));

        let at_max_depth = self.config.max_depth.is_some_and(|d| depth >= d);
        if impurity.is_pure() || at_max_depth || samples.len() < self.config.min_samples_split {
            return slot;
        }
        let Some(split) = self.ctx.find_best_split(samples, &counts, impurity, rng) else {
            return slot;
        };

        let left = self.grow(&split.left_indices, depth + 1, rng, nodes);
        let right = self.grow(&split.right_indices, depth + 1, rng, nodes);
        nodes[slot.index()] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples: samples.len(),
            impurity_decrease: split.impurity_decrease,
        };
        slot
    }
}

/// A fitted CART decision tree stored as a node arena rooted at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class index for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("leaf_for always ends at a leaf"),
        }
    }

    /// Return the class distribution of the leaf reached by `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("leaf_for always ends at a leaf"),
        }
    }

    /// Mean Decrease in Impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest leaf; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), depth + 1));
                    stack.push((right.index(), depth + 1));
                }
            }
        }
        max_depth
    }

    fn leaf_for(&self, sample: &[f64]) -> Result<&Node, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut node = &self.nodes[0];
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = node
        {
            let next = if sample[feature.index()] <= *threshold {
                left
            } else {
                right
            };
            node = &self.nodes[next.index()];
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    fn xor() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        (features, vec![0, 1, 1, 0])
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 0, 0]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn separable_predictions() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.n_leaves(), 2);
        let proba = tree.predict_proba(&[5.0, 0.0]).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn xor_needs_two_levels() {
        let (features, labels) = xor();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert!(tree.depth() >= 2);
        for (row, &label) in features.iter().zip(&labels) {
            assert_eq!(tree.predict(row).unwrap(), label);
        }
    }

    #[test]
    fn max_depth_limits_tree() {
        let (features, labels) = xor();
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, &labels)
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn n_classes_widens_leaf_distribution() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new()
            .with_n_classes(Some(4))
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.predict_proba(&[1.0, 0.0]).unwrap().len(), 4);
    }

    #[test]
    fn importances_favor_informative_feature() {
        let (features, labels) = separable();
        let importances = DecisionTreeConfig::new()
            .fit(&features, &labels)
            .unwrap()
            .feature_importances();
        assert!((importances[0] - 1.0).abs() < 1e-10);
        assert!(importances[1].abs() < 1e-10);
    }

    #[test]
    fn config_validation_errors() {
        let (features, labels) = separable();
        let err = DecisionTreeConfig::new()
            .with_max_depth(Some(0))
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMaxDepth { .. }));

        let err = DecisionTreeConfig::new()
            .with_min_samples_split(1)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMinSamplesSplit { .. }));

        let err = DecisionTreeConfig::new()
            .with_max_features(Some(3))
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMaxFeatures { max_features: 3, n_features: 2 }));
    }

    #[test]
    fn data_validation_errors() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, 2.0], vec![3.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, RfError::FeatureCountMismatch { sample_index: 1, .. }));

        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, f64::NAN], vec![3.0, 4.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, RfError::NonFiniteValue { sample_index: 0, feature_index: 1 }));

        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0], vec![3.0]], &[0])
            .unwrap_err();
        assert!(matches!(err, RfError::LabelCountMismatch { .. }));
    }

    #[test]
    fn prediction_feature_mismatch() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(err, RfError::PredictionFeatureMismatch { expected: 2, got: 1 }));
    }
}
