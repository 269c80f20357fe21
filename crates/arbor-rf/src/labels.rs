//! Human-readable names for class indices.

use serde::{Deserialize, Serialize};

/// Class labels in ascending order; position `i` names class index `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels(Vec<String>);

impl ClassLabels {
    /// Wrap already-sorted labels.
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    /// Placeholder labels `"0"`, `"1"`, ... for `n_classes` classes.
    #[must_use]
    pub fn numbered(n_classes: usize) -> Self {
        Self((0..n_classes).map(|c| c.to_string()).collect())
    }

    /// Return the label for a class index, if it exists.
    #[must_use]
    pub fn get(&self, class: usize) -> Option<&str> {
        self.0.get(class).map(String::as_str)
    }

    /// Return the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when no labels are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the labels as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_labels() {
        let labels = ClassLabels::numbered(3);
        assert_eq!(labels.as_slice(), &["0", "1", "2"]);
        assert_eq!(labels.get(2), Some("2"));
        assert_eq!(labels.get(3), None);
    }
}
