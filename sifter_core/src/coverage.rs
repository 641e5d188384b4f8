use crate::feature::{DomainFilter, Feature};
use std::collections::HashMap;
use std::fmt;

/// Tracks which features one distillation run has already observed, and how
/// often.
///
/// A `FeatureSet` is created fresh at the start of a run and dropped at its
/// end; it is never shared between concurrently executing runs. Counts only
/// increase over the set's lifetime.
pub struct FeatureSet {
    /// A feature counts as unseen while its observed frequency is below
    /// this threshold. Distillation uses a threshold of 1.
    frequency_threshold: u32,
    frequencies: HashMap<Feature, u32>,
    filter: DomainFilter,
}

impl FeatureSet {
    /// Creates an empty set. A `frequency_threshold` of 0 is treated as 1.
    pub fn new(frequency_threshold: u32, filter: DomainFilter) -> Self {
        Self {
            frequency_threshold: frequency_threshold.max(1),
            frequencies: HashMap::new(),
            filter,
        }
    }

    /// Removes identifiers from discarded domains. Returns a new vector;
    /// the input slice is left untouched.
    pub fn prune(&self, features: &[Feature]) -> Vec<Feature> {
        self.filter.prune(features)
    }

    /// Returns `true` iff at least one identifier has been observed fewer
    /// than `frequency_threshold` times.
    pub fn has_unseen(&self, features: &[Feature]) -> bool {
        features.iter().any(|feature| {
            self.frequencies.get(feature).copied().unwrap_or(0) < self.frequency_threshold
        })
    }

    /// Records every identifier. Counts saturate at the threshold.
    pub fn increment(&mut self, features: &[Feature]) {
        for &feature in features {
            let count = self.frequencies.entry(feature).or_insert(0);
            if *count < self.frequency_threshold {
                *count += 1;
            }
        }
    }

    /// Number of distinct features observed so far. Non-decreasing.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ft: {}", self.frequencies.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::feature_in_domain;

    #[test]
    fn fresh_set_treats_everything_as_unseen() {
        let set = FeatureSet::new(1, DomainFilter::default());
        assert!(set.is_empty());
        assert!(set.has_unseen(&[1, 2, 3]));
        assert!(
            !set.has_unseen(&[]),
            "an empty feature vector has nothing unseen"
        );
    }

    #[test]
    fn increment_marks_features_as_seen_and_len_grows_monotonically() {
        let mut set = FeatureSet::new(1, DomainFilter::default());

        set.increment(&[10, 20]);
        assert_eq!(set.len(), 2);
        assert!(!set.has_unseen(&[10, 20]));
        assert!(set.has_unseen(&[10, 30]), "30 has not been observed yet");

        set.increment(&[10, 30]);
        assert_eq!(set.len(), 3);
        assert!(!set.has_unseen(&[10, 20, 30]));
    }

    #[test]
    fn frequency_threshold_above_one_needs_repeated_observations() {
        let mut set = FeatureSet::new(2, DomainFilter::default());

        set.increment(&[5]);
        assert!(
            set.has_unseen(&[5]),
            "one observation is below a threshold of 2"
        );

        set.increment(&[5]);
        assert!(!set.has_unseen(&[5]));

        // Counts saturate at the threshold.
        set.increment(&[5]);
        assert!(!set.has_unseen(&[5]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn prune_delegates_to_the_domain_filter() {
        let kept = feature_in_domain(1, 7);
        let discarded = feature_in_domain(4, 8);
        let set = FeatureSet::new(1, DomainFilter::new(&[4]));

        assert_eq!(set.prune(&[kept, discarded]), vec![kept]);
    }

    #[test]
    fn display_reports_distinct_feature_count() {
        let mut set = FeatureSet::new(1, DomainFilter::default());
        set.increment(&[1, 2, 2, 3]);
        assert_eq!(format!("{set}"), "ft: 3");
    }
}
