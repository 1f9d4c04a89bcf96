//! Event trait and the event envelope consumed by the projection engine.
//!
//! Events are immutable facts produced by the write-side aggregates. The
//! engine never creates or mutates them; it only consumes an ordered,
//! at-least-once stream of [`EventEnvelope`] records and materializes read
//! models from them.
//!
//! # Design
//!
//! Event payloads are serialized with `bincode` for performance and minimal
//! storage overhead. The envelope carries the routing metadata the engine
//! needs (aggregate id, aggregate type, sequence number, event type name)
//! next to the opaque payload bytes; the projection handlers know the
//! concrete payload types and deserialize at the edge.
//!
//! # Example
//!
//! ```
//! use readflow_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum CourierEvent {
//!     Created { first_name: String, last_name: String },
//! }
//!
//! impl Event for CourierEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             CourierEvent::Created { .. } => "CourierCreated.v1",
//!         }
//!     }
//!
//!     fn aggregate_type(&self) -> &'static str {
//!         "courier"
//!     }
//! }
//! ```

use crate::aggregate::{AggregateId, SequenceNumber};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// Unknown event type encountered during deserialization.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// A domain event consumed by projection handlers.
///
/// # Event Naming Convention
///
/// `event_type()` returns a stable string identifier with a version suffix,
/// allowing event schemas to evolve over time:
///
/// - `"OrderCreationInitiated.v1"`
/// - `"OrderDelivered.v1"`
/// - `"OrderDelivered.v2"` (after a schema change)
///
/// # Aggregate Type
///
/// `aggregate_type()` names the write-side aggregate this event kind belongs
/// to (e.g. `"order"`). The replay coordinator uses it to read the full
/// historical log for the aggregate types a processing group owns.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate type this event kind belongs to.
    fn aggregate_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized, which is rare with bincode.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are
    /// corrupted, represent a different event type, or the schema changed
    /// incompatibly.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// An immutable event record as delivered by the event source.
///
/// This is the wire format between the external event source and the
/// projection engine: routing metadata plus the bincode-serialized payload.
/// The engine treats the payload as opaque; handlers deserialize it to
/// their concrete event enum.
#[derive(Clone, Debug)]
pub struct EventEnvelope {
    /// Identifier of the aggregate that produced this event.
    pub aggregate_id: AggregateId,

    /// Aggregate type name (e.g. `"order"`).
    pub aggregate_type: String,

    /// Strictly increasing per-aggregate event ordinal.
    pub sequence_number: SequenceNumber,

    /// Versioned event type identifier (e.g. `"OrderDelivered.v1"`).
    pub event_type: String,

    /// The bincode-serialized event payload.
    pub data: Vec<u8>,

    /// Optional metadata attached by the producer.
    ///
    /// Common fields: `correlation_id`, `causation_id`. Authentication and
    /// audit metadata are outside the engine's scope and pass through
    /// untouched.
    pub metadata: Option<serde_json::Value>,

    /// When the event was recorded by the event source.
    pub recorded_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Create an envelope from a domain event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the payload cannot be
    /// serialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use readflow_core::aggregate::{AggregateId, SequenceNumber};
    /// use readflow_core::event::{Event, EventEnvelope};
    /// # use serde::{Serialize, Deserialize};
    /// # #[derive(Clone, Debug, Serialize, Deserialize)]
    /// # enum CourierEvent { Created { first_name: String } }
    /// # impl Event for CourierEvent {
    /// #     fn event_type(&self) -> &'static str { "CourierCreated.v1" }
    /// #     fn aggregate_type(&self) -> &'static str { "courier" }
    /// # }
    ///
    /// let event = CourierEvent::Created { first_name: "John".to_string() };
    /// let envelope = EventEnvelope::from_event(
    ///     AggregateId::new("courier-1"),
    ///     SequenceNumber::new(1),
    ///     &event,
    /// ).unwrap();
    ///
    /// assert_eq!(envelope.event_type, "CourierCreated.v1");
    /// assert_eq!(envelope.aggregate_type, "courier");
    /// ```
    pub fn from_event<E: Event + Serialize>(
        aggregate_id: AggregateId,
        sequence_number: SequenceNumber,
        event: &E,
    ) -> Result<Self, EventError> {
        Ok(Self {
            aggregate_id,
            aggregate_type: event.aggregate_type().to_string(),
            sequence_number,
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata: None,
            recorded_at: Utc::now(),
        })
    }

    /// Attach producer metadata to the envelope.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Display for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventEnvelope {{ type: {}, aggregate: {}/{}, seq: {} }}",
            self.event_type, self.aggregate_type, self.aggregate_id, self.sequence_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Created { id: String, value: i32 },
        Updated { id: String, new_value: i32 },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestEvent.Created.v1",
                TestEvent::Updated { .. } => "TestEvent.Updated.v1",
            }
        }

        fn aggregate_type(&self) -> &'static str {
            "test"
        }
    }

    #[test]
    fn event_type_returns_correct_identifier() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 42,
        };
        assert_eq!(event.event_type(), "TestEvent.Created.v1");
        assert_eq!(event.aggregate_type(), "test");
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn event_serialization_roundtrip() {
        let event = TestEvent::Updated {
            id: "test-1".to_string(),
            new_value: 100,
        };

        let bytes = event.to_bytes().expect("serialization should succeed");
        let deserialized = TestEvent::from_bytes(&bytes).expect("deserialization should succeed");

        assert_eq!(event, deserialized);
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn envelope_from_event() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 42,
        };

        let envelope = EventEnvelope::from_event(
            AggregateId::new("test-1"),
            SequenceNumber::new(1),
            &event,
        )
        .expect("serialization should succeed")
        .with_metadata(serde_json::json!({ "correlation_id": "corr-1" }));

        assert_eq!(envelope.event_type, "TestEvent.Created.v1");
        assert_eq!(envelope.aggregate_type, "test");
        assert_eq!(envelope.sequence_number, SequenceNumber::new(1));
        assert!(!envelope.data.is_empty());
        assert!(envelope.metadata.is_some());
    }

    #[test]
    fn envelope_display() {
        let envelope = EventEnvelope {
            aggregate_id: AggregateId::new("order-1"),
            aggregate_type: "order".to_string(),
            sequence_number: SequenceNumber::new(3),
            event_type: "OrderPrepared.v1".to_string(),
            data: vec![],
            metadata: None,
            recorded_at: Utc::now(),
        };

        let display = format!("{envelope}");
        assert!(display.contains("OrderPrepared.v1"));
        assert!(display.contains("order/order-1"));
        assert!(display.contains("seq: 3"));
    }
}
