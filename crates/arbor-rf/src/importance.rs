//! Feature importance aggregation across trees.

use serde::Serialize;

/// A feature with its normalized importance and 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFeature {
    pub name: String,
    /// Share of total impurity decrease; sums to 1.0 across features.
    pub importance: f64,
    /// 1 = most important.
    pub rank: usize,
}

/// Sum per-tree MDI vectors, normalize, and rank descending.
///
/// Ties keep the column order of `names`.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], names: &[String]) -> Vec<RankedFeature> {
    let mut totals = vec![0.0f64; names.len()];
    for tree in per_tree {
        for (total, &value) in totals.iter_mut().zip(tree) {
            *total += value;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in ranked.iter_mut().enumerate() {
        feature.rank = i + 1;
    }
    ranked
}
