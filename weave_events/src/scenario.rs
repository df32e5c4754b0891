//! Categorical ordering of scenario labels.
//!
//! `historical` always comes first; every other label follows in lexical
//! order. Grouping, sorting and any legend built downstream rely on this
//! order being the same for every table.

use std::{cmp::Ordering, collections::BTreeSet};

use serde::{Deserialize, Serialize};

/// Label of the reference-period scenario.
pub const HISTORICAL: &str = "historical";

/// Ordered scenario categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOrder {
    categories: Vec<String>,
}

impl ScenarioOrder {
    /// Builds the order from any collection of labels (duplicates collapse).
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut has_historical = false;
        let mut rest = BTreeSet::new();
        for label in labels {
            let label = label.as_ref();
            if label == HISTORICAL {
                has_historical = true;
            } else {
                rest.insert(label.to_string());
            }
        }
        let mut categories = Vec::with_capacity(rest.len() + usize::from(has_historical));
        if has_historical {
            categories.push(HISTORICAL.to_string());
        }
        categories.extend(rest);
        Self { categories }
    }

    /// Categories in order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Position of `label`, or `None` if it is not a category.
    pub fn rank(&self, label: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == label)
    }

    /// Compares two labels by category order; unknown labels sort last,
    /// lexically among themselves.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let ra = self.rank(a).unwrap_or(usize::MAX);
        let rb = self.rank(b).unwrap_or(usize::MAX);
        ra.cmp(&rb).then_with(|| a.cmp(b))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// `true` if there are no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn historical_first_rest_sorted() {
        let order = ScenarioOrder::from_labels(["SP585", "historical", "SP126", "SP245", "SP126"]);
        assert_eq!(order.categories(), &["historical", "SP126", "SP245", "SP585"]);
        assert_eq!(order.rank("historical"), Some(0));
        assert_eq!(order.compare("SP585", "historical"), Ordering::Greater);
    }

    #[test]
    fn without_historical_is_plain_sorted() {
        let order = ScenarioOrder::from_labels(["SP370", "SP126"]);
        assert_eq!(order.categories(), &["SP126", "SP370"]);
    }

    #[test]
    fn unknown_labels_sort_last() {
        let order = ScenarioOrder::from_labels(["historical"]);
        assert_eq!(order.compare("zzz", "historical"), Ordering::Greater);
        assert_eq!(order.rank("zzz"), None);
    }

    proptest! {
        #[test]
        fn historical_is_always_first(
            others in proptest::collection::vec("[A-Za-z0-9]{1,6}", 0..8),
            at in 0usize..8,
        ) {
            let mut labels = others.clone();
            labels.insert(at.min(labels.len()), HISTORICAL.to_string());
            let order = ScenarioOrder::from_labels(&labels);

            prop_assert_eq!(order.categories()[0].as_str(), HISTORICAL);
            let rest = &order.categories()[1..];
            prop_assert!(rest.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(rest.iter().all(|c| c != HISTORICAL));
        }
    }
}
