//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::labels::ClassLabels;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_training_data};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) class_labels: ClassLabels,
}

impl RandomForest {
    /// Attach names to the class indices this forest predicts.
    ///
    /// Extra labels widen the class count, so the forest can name classes
    /// that were absent from its training partition.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::ClassLabelMismatch`] if fewer labels than trained
    /// classes are supplied.
    pub fn with_class_labels(mut self, class_labels: ClassLabels) -> Result<Self, RfError> {
        if class_labels.len() < self.n_classes {
            return Err(RfError::ClassLabelMismatch {
                n_classes: self.n_classes,
                n_labels: class_labels.len(),
            });
        }
        self.n_classes = class_labels.len();
        self.class_labels = class_labels;
        Ok(self)
    }
}

/// Draw `draw_count` row indices with replacement.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_training_data(features, labels)?;
    let n_samples = features.len();
    let max_features = config.max_features.resolve(n_features)?;
    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(RfError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features,
        draw_count,
        "training random forest"
    );

    // Seeds are drawn sequentially so the forest does not depend on scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features))
        .with_n_classes(Some(n_classes));

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rows = bootstrap_sample(n_samples, draw_count, &mut rng);
            let boot_features: Vec<Vec<f64>> = rows.iter().map(|&i| features[i].clone()).collect();
            let boot_labels: Vec<usize> = rows.iter().map(|&i| labels[i]).collect();
            tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit(&boot_features, &boot_labels)
        })
        .collect::<Result<_, _>>()?;

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);
    debug!(
        mean_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>() as f64 / trees.len() as f64,
        "tree training complete"
    );

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
        class_labels: ClassLabels::numbered(n_classes),
    };
    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved: max_features,
    };

    Ok(RandomForestResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::labels::ClassLabels;

    /// Three well-separated classes along `x`; `y` is constant noise.
    fn make_separable_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for class in 0..3 {
            for i in 0..20 {
                features.push(vec![class as f64 * 10.0 + i as f64 * 0.15, 0.5]);
                labels.push(class);
            }
        }
        (features, labels, vec!["x".to_string(), "y".to_string()])
    }

    #[test]
    fn three_class_separable_accuracy() {
        let (features, labels, names) = make_separable_data();
        let result = RandomForestConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let predictions = result.forest().predict_batch(&features).unwrap();
        let correct = predictions.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert!(correct as f64 / labels.len() as f64 > 0.9);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_separable_data();
        let fit = || {
            RandomForestConfig::new(10)
                .unwrap()
                .with_seed(99)
                .fit(&features, &labels, &names)
                .unwrap()
        };
        let (a, b) = (fit(), fit());
        assert_eq!(
            a.forest().predict_proba_batch(&features).unwrap(),
            b.forest().predict_proba_batch(&features).unwrap()
        );
    }

    #[test]
    fn metadata_reflects_training_set() {
        let (features, labels, names) = make_separable_data();
        let result = RandomForestConfig::new(5).unwrap().fit(&features, &labels, &names).unwrap();
        let meta = result.metadata();
        assert_eq!(meta.n_samples, 60);
        assert_eq!(meta.n_classes, 3);
        // floor(sqrt(2)) features per split.
        assert_eq!(meta.max_features_resolved, 1);
        assert_eq!(result.forest().n_trees(), 5);
    }

    #[test]
    fn invalid_bootstrap_fraction() {
        let (features, labels, names) = make_separable_data();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_bootstrap_fraction(1.5)
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, crate::RfError::InvalidBootstrapFraction { .. }));
    }

    #[test]
    fn class_labels_must_cover_classes() {
        let (features, labels, names) = make_separable_data();
        let forest = RandomForestConfig::new(3)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest();
        let err = forest
            .clone()
            .with_class_labels(ClassLabels::numbered(2))
            .unwrap_err();
        assert!(matches!(err, crate::RfError::ClassLabelMismatch { n_classes: 3, n_labels: 2 }));

        let named = forest
            .with_class_labels(ClassLabels::new(vec!["a".into(), "b".into(), "c".into()]))
            .unwrap();
        assert_eq!(named.predict_label(&[25.0, 0.5]).unwrap(), "c");
    }

    #[test]
    fn empty_dataset_error() {
        let err = RandomForestConfig::new(10).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, crate::RfError::EmptyDataset));
    }
}
