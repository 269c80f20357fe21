//! Random Forest classification: train, evaluate, predict, persist.
//!
//! Provides a hand-rolled Random Forest classifier with CART decision trees,
//! Gini/Entropy split criteria, parallel training via rayon, stratified
//! hold-out evaluation, MDI feature importance, and bincode model files.

mod config;
mod confusion;
mod error;
mod forest;
mod holdout;
mod importance;
mod labels;
mod node;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{DEFAULT_N_TREES, MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use holdout::{DEFAULT_TEST_SIZE, Holdout, HoldoutResult, TrainTestSplit};
pub use importance::RankedFeature;
pub use labels::ClassLabels;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
