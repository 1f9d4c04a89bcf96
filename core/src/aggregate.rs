//! Aggregate identity and sequencing types.
//!
//! This module defines strong types for identifying the write-side aggregate
//! an event belongs to (`AggregateId`) and for ordering the events of a
//! single aggregate (`SequenceNumber`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `AggregateId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid aggregate ID: {0}")]
pub struct ParseAggregateIdError(String);

/// Unique identifier of a write-side aggregate instance.
///
/// The read model is keyed by this identifier: every event carries the id of
/// the aggregate that produced it, and the projected entity for that
/// aggregate uses the same id as its primary key. For example:
/// - `"order-12345"`
/// - `"customer-abc-def"`
///
/// # Validation
///
/// - `FromStr::from_str()`: validates input (rejects empty strings)
/// - `From::from()` and `new()`: no validation (for application-controlled
///   input)
///
/// # Examples
///
/// ```
/// use readflow_core::aggregate::AggregateId;
///
/// let id = AggregateId::new("order-12345");
/// assert_eq!(id.as_str(), "order-12345");
///
/// let parsed: AggregateId = "customer-abc".parse().unwrap();
/// assert_eq!(parsed, AggregateId::new("customer-abc"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateId(String);

impl AggregateId {
    /// Create a new `AggregateId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the aggregate ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `AggregateId` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AggregateId {
    type Err = ParseAggregateIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAggregateIdError(
                "Aggregate ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for AggregateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AggregateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for AggregateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-aggregate event ordinal.
///
/// Sequence numbers are strictly increasing within a single aggregate's
/// event stream. The read model mirrors the sequence number of the last
/// applied event into the entity's `aggregate_version` field, which is the
/// core consistency marker of the projection:
///
/// > for any entity, `aggregate_version` equals the sequence number of the
/// > most recently applied event for that aggregate id.
///
/// # Examples
///
/// ```
/// use readflow_core::aggregate::SequenceNumber;
///
/// let first = SequenceNumber::new(1);
/// assert_eq!(first.next(), SequenceNumber::new(2));
/// assert_eq!(first.value(), 1);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// The sequence number of the first event of an aggregate (1).
    pub const INITIAL: Self = Self(1);

    /// Create a new `SequenceNumber` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the sequence number as a plain integer.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next sequence number (current + 1).
    ///
    /// # Overflow Behavior
    ///
    /// Reaching `u64::MAX` events for a single aggregate is not a realistic
    /// concern; plain addition is used.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the first sequence number of an aggregate.
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 1
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u64 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}
