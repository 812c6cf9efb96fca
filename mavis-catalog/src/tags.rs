//! Inclusion/exclusion tag filtering (spec §4.7).

use std::collections::HashSet;

/// `keep = (inclusions empty OR tags ∩ inclusions != ∅)
///         AND (exclusions empty OR tags ∩ exclusions == ∅)`.
///
/// An untagged entry is kept only when no inclusion list is active: an
/// empty `tags` set never intersects a non-empty `inclusions` set.
pub fn keep(tags: &HashSet<String>, inclusions: &HashSet<String>, exclusions: &HashSet<String>) -> bool {
    let included = inclusions.is_empty() || tags.iter().any(|t| inclusions.contains(t));
    let excluded = !exclusions.is_empty() && tags.iter().any(|t| exclusions.contains(t));
    included && !excluded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_filters_keeps_everything() {
        assert!(keep(&set(&["rv64", "v"]), &set(&[]), &set(&[])));
        assert!(keep(&set(&[]), &set(&[]), &set(&[])));
    }

    #[test]
    fn inclusion_requires_overlap() {
        let inclusions = set(&["v"]);
        assert!(keep(&set(&["rv64", "v"]), &inclusions, &set(&[])));
        assert!(!keep(&set(&["rv64"]), &inclusions, &set(&[])));
        assert!(!keep(&set(&[]), &inclusions, &set(&[])));
    }

    #[test]
    fn exclusion_removes_overlap() {
        let exclusions = set(&["experimental"]);
        assert!(!keep(&set(&["rv64", "experimental"]), &set(&[]), &exclusions));
        assert!(keep(&set(&["rv64"]), &set(&[]), &exclusions));
    }
}
