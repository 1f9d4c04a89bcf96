//! Query filters for live subscription queries.
//!
//! Subscription filters are small serializable predicate objects rather
//! than opaque closures. This keeps them inspectable and testable, and
//! avoids bugs from incidentally captured state.

use crate::aggregate::AggregateId;
use serde::{Deserialize, Serialize};

/// Predicate deciding which entities a subscription receives.
///
/// # Examples
///
/// ```
/// use readflow_core::aggregate::AggregateId;
/// use readflow_core::query::QueryFilter;
///
/// let by_id = QueryFilter::ById(AggregateId::new("order-1"));
/// assert!(by_id.matches(&AggregateId::new("order-1")));
/// assert!(!by_id.matches(&AggregateId::new("order-2")));
///
/// assert!(QueryFilter::All.matches(&AggregateId::new("anything")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFilter {
    /// Matches exactly one aggregate id (a live point query).
    ById(AggregateId),

    /// Matches any of the listed aggregate ids.
    AnyOf(Vec<AggregateId>),

    /// Matches every entity (a live collection query).
    All,
}

impl QueryFilter {
    /// Evaluate the filter against an entity's aggregate id.
    #[must_use]
    pub fn matches(&self, id: &AggregateId) -> bool {
        match self {
            Self::ById(expected) => expected == id,
            Self::AnyOf(ids) => ids.contains(id),
            Self::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_id_matches_only_that_id() {
        let filter = QueryFilter::ById(AggregateId::new("customer-1"));
        assert!(filter.matches(&AggregateId::new("customer-1")));
        assert!(!filter.matches(&AggregateId::new("customer-2")));
    }

    #[test]
    fn any_of_matches_listed_ids() {
        let filter = QueryFilter::AnyOf(vec![
            AggregateId::new("a"),
            AggregateId::new("b"),
        ]);
        assert!(filter.matches(&AggregateId::new("a")));
        assert!(filter.matches(&AggregateId::new("b")));
        assert!(!filter.matches(&AggregateId::new("c")));
    }

    #[test]
    fn all_matches_everything() {
        assert!(QueryFilter::All.matches(&AggregateId::new("anything")));
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn filters_are_serializable() {
        let filter = QueryFilter::ById(AggregateId::new("order-1"));
        let json = serde_json::to_string(&filter).expect("serialize should succeed");
        let back: QueryFilter = serde_json::from_str(&json).expect("deserialize should succeed");
        assert_eq!(filter, back);
    }
}
