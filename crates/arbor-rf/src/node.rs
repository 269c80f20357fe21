use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a node inside a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node impurity under the tree's split criterion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return `true` when the node holds a single class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Children are addressed by [`NodeIndex`]; the root always sits at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Interior node: samples with `value <= threshold` go left.
    Split {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: Impurity,
        n_samples: usize,
        /// Sample-weighted impurity decrease, accumulated into MDI importances.
        impurity_decrease: f64,
    },
    /// Terminal node holding the class distribution of its training samples.
    Leaf {
        prediction: usize,
        distribution: Vec<f64>,
        impurity: Impurity,
        n_samples: usize,
    },
}

impl Node {
    /// Build a leaf from the class counts of the samples that reached it.
    ///
    /// Ties in the majority vote resolve to the lowest class index.
    pub(crate) fn leaf(class_counts: &[usize], impurity: Impurity) -> Self {
        let n_samples: usize = class_counts.iter().sum();
        let total = n_samples.max(1) as f64;
        let distribution = class_counts.iter().map(|&c| c as f64 / total).collect();
        let mut prediction = 0;
        for (class, &count) in class_counts.iter().enumerate() {
            if count > class_counts[prediction] {
                prediction = class;
            }
        }
        Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
        }
    }

    /// Return the impurity at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
