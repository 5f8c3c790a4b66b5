// ============================================================
// Layer 4 — Feature Grouper
// ============================================================
// One Example can overflow into several Features. Before
// decoding we need the reverse lookup:
//
//   features:  [q1, q1, q2, q3, q3, q3]
//   groups:    q1 → [0, 1]   q2 → [2]   q3 → [3, 4, 5]
//
// Indices inside a group keep Feature storage order.

use std::collections::HashMap;

use crate::domain::feature::EvalFeature;

/// example_id → ordered feature indices
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeatureGroups {
    groups: HashMap<String, Vec<usize>>,
}

impl FeatureGroups {
    /// Feature indices of one example; empty if the example has none.
    pub fn features_for(&self, example_id: &str) -> &[usize] {
        self.groups
            .get(example_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Single pass over example ids in feature storage order.
pub fn group_by_example<'a, I>(example_ids: I) -> FeatureGroups
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, id) in example_ids.into_iter().enumerate() {
        groups.entry(id.to_string()).or_default().push(index);
    }
    FeatureGroups { groups }
}

/// Group persisted validation/test features by their example id.
pub fn group_features(features: &[EvalFeature]) -> FeatureGroups {
    group_by_example(features.iter().map(|f| f.example_id.as_str()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_keep_storage_order() {
        let groups = group_by_example(["q1", "q1", "q2", "q3", "q3", "q3"]);
        assert_eq!(groups.features_for("q1"), &[0, 1]);
        assert_eq!(groups.features_for("q2"), &[2]);
        assert_eq!(groups.features_for("q3"), &[3, 4, 5]);
        assert!(groups.features_for("q4").is_empty());
    }

    #[test]
    fn test_interleaved_ids_are_grouped() {
        let groups = group_by_example(["a", "b", "a"]);
        assert_eq!(groups.features_for("a"), &[0, 2]);
        assert_eq!(groups.features_for("b"), &[1]);
    }

    #[test]
    fn test_unknown_example_has_no_features() {
        let groups = group_by_example(Vec::<&str>::new());
        assert_eq!(groups, FeatureGroups::default());
        assert!(groups.features_for("missing").is_empty());
    }
}
