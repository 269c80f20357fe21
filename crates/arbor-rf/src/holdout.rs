//! Hold-out evaluation: seeded train/test split, fit, score.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::confusion::{ClassMetrics, ConfusionMatrix};
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::labels::ClassLabels;

/// Fraction of rows held out when the caller does not choose one.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    /// Whether class proportions were preserved across the partition.
    pub stratified: bool,
}

/// Hold-out evaluation configuration.
///
/// Construct via [`Holdout::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct Holdout {
    test_size: f64,
    seed: u64,
}

/// Outcome of a hold-out evaluation.
#[derive(Debug)]
pub struct HoldoutResult {
    /// Forest fitted on the training partition.
    pub forest: RandomForest,
    /// Fraction of test samples predicted exactly.
    pub accuracy: f64,
    /// Actual vs. predicted counts over the test partition.
    pub confusion_matrix: ConfusionMatrix,
    /// Per-class metrics derived from `confusion_matrix`.
    pub class_metrics: Vec<ClassMetrics>,
    /// Ranked MDI importances of the fitted forest.
    pub feature_importances: Vec<RankedFeature>,
    pub n_train: usize,
    pub n_test: usize,
    pub stratified: bool,
}

impl Holdout {
    /// Create a hold-out config that reserves `test_size` of the rows.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTestSize`] unless `0.0 < test_size < 1.0`.
    pub fn new(test_size: f64) -> Result<Self, RfError> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(RfError::InvalidTestSize { test_size });
        }
        Ok(Self { test_size, seed: 42 })
    }

    /// Set the random seed for the partition shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the held-out fraction.
    #[must_use]
    pub fn test_size(&self) -> f64 {
        self.test_size
    }

    /// Partition row indices into train and test sets.
    ///
    /// `n_test = ceil(test_size * n)` and the rest train. With two or more
    /// classes the split is stratified: each class contributes
    /// `floor(n_test * n_c / n)` test rows, and leftover slots go to the
    /// classes with the largest fractional remainders. A single class is
    /// split by a plain shuffle.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels |
    /// | [`RfError::EmptyPartition`] | Either partition would be empty |
    /// | [`RfError::ClassTooSmallToStratify`] | A class has a single sample |
    /// | [`RfError::PartitionSmallerThanClasses`] | A partition cannot hold every class |
    pub fn split(&self, labels: &[usize]) -> Result<TrainTestSplit, RfError> {
        self.partition(labels, None)
    }

    /// [`Holdout::split`], naming classes with `class_labels` in errors.
    fn partition(
        &self,
        labels: &[usize],
        class_labels: Option<&ClassLabels>,
    ) -> Result<TrainTestSplit, RfError> {
        let n_samples = labels.len();
        if n_samples == 0 {
            return Err(RfError::EmptyDataset);
        }
        let n_test = (self.test_size * n_samples as f64).ceil() as usize;
        let n_train = n_samples.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(RfError::EmptyPartition {
                test_size: self.test_size,
                n_samples,
                n_train,
                n_test,
            });
        }

        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (row, &class) in labels.iter().enumerate() {
            by_class[class].push(row);
        }
        by_class.retain(|rows| !rows.is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let (mut train, mut test, stratified) = if by_class.len() > 1 {
            let (train, test) = stratified_partition(&mut by_class, labels, class_labels, n_test, n_train, &mut rng)?;
            (train, test, true)
        } else {
            let mut rows: Vec<usize> = (0..n_samples).collect();
            rows.shuffle(&mut rng);
            let train = rows.split_off(n_test);
            (train, rows, false)
        };
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        debug!(n_train, n_test, stratified, "partitioned rows");
        Ok(TrainTestSplit {
            train,
            test,
            stratified,
        })
    }

    /// Split, fit `config` on the training rows, and score the test rows.
    ///
    /// The fitted forest is named with `class_labels`.
    ///
    /// # Errors
    ///
    /// Any error from [`Holdout::split`], from training, or
    /// [`RfError::ClassLabelMismatch`] when `class_labels` is too short.
    #[instrument(skip_all, fields(test_size = self.test_size, n_samples = features.len()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        class_labels: &ClassLabels,
    ) -> Result<HoldoutResult, RfError> {
        if features.len() != labels.len() {
            return Err(RfError::LabelCountMismatch {
                n_features_rows: features.len(),
                n_labels: labels.len(),
            });
        }
        let split = self.partition(labels, Some(class_labels))?;
        let gather = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
            rows.iter().map(|&i| (features[i].clone(), labels[i])).unzip()
        };
        let (train_features, train_labels) = gather(&split.train);
        let (test_features, test_labels) = gather(&split.test);

        let (forest, feature_importances, _) = config
            .fit(&train_features, &train_labels, feature_names)?
            .into_parts();
        let forest = forest.with_class_labels(class_labels.clone())?;

        let predictions = forest.predict_batch(&test_features)?;
        let confusion_matrix = ConfusionMatrix::from_labels(&test_labels, &predictions)?;
        let accuracy = confusion_matrix.accuracy();
        let class_metrics = confusion_matrix.class_metrics();

        info!(
            accuracy,
            n_train = split.train.len(),
            n_test = split.test.len(),
            stratified = split.stratified,
            "hold-out evaluation complete"
        );

        Ok(HoldoutResult {
            forest,
            accuracy,
            confusion_matrix,
            class_metrics,
            feature_importances,
            n_train: split.train.len(),
            n_test: split.test.len(),
            stratified: split.stratified,
        })
    }
}

/// Draw each class's share of the test set from its shuffled rows.
fn stratified_partition(
    by_class: &mut [Vec<usize>],
    labels: &[usize],
    class_labels: Option<&ClassLabels>,
    n_test: usize,
    n_train: usize,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>), RfError> {
    let n_classes = by_class.len();
    if let Some(rows) = by_class.iter().find(|rows| rows.len() < 2) {
        let class = labels[rows[0]];
        let label = class_labels
            .and_then(|names| names.get(class))
            .map_or_else(|| class.to_string(), str::to_string);
        return Err(RfError::ClassTooSmallToStratify {
            class,
            label,
            count: rows.len(),
        });
    }
    for (partition, size) in [("test", n_test), ("train", n_train)] {
        if size < n_classes {
            return Err(RfError::PartitionSmallerThanClasses {
                partition,
                size,
                n_classes,
            });
        }
    }

    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    let quotas = allocate(&counts, n_test);

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (rows, quota) in by_class.iter_mut().zip(quotas) {
        rows.shuffle(rng);
        test.extend_from_slice(&rows[..quota]);
        train.extend_from_slice(&rows[quota..]);
    }
    Ok((train, test))
}

/// Apportion `total` slots across classes proportionally to `counts`.
///
/// Floors first, then hands the remaining slots to the largest fractional
/// remainders, ties to the lower class. No class receives more slots than it
/// has rows.
fn allocate(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let mut quotas: Vec<usize> = counts.iter().map(|&c| c * total / n).collect();
    let mut remainders: Vec<(usize, usize)> = counts
        .iter()
        .enumerate()
        .map(|(class, &c)| (c * total % n, class))
        .collect();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut left = total - quotas.iter().sum::<usize>();
    for &(_, class) in remainders.iter().cycle() {
        if left == 0 {
            break;
        }
        if quotas[class] < counts[class] {
            quotas[class] += 1;
            left -= 1;
        }
    }
    quotas
}
