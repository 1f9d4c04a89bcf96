//! # Readflow Core
//!
//! Core traits and types for the readflow projection engine.
//!
//! Readflow is the query side of a CQRS system: it consumes an ordered
//! event stream per aggregate, materializes denormalized entities, supports
//! full projection rebuild (reset + replay), and serves both point-in-time
//! queries and live subscription queries.
//!
//! ## Core Concepts
//!
//! - **Event**: an immutable fact from the write side, delivered in an
//!   [`event::EventEnvelope`] with a strictly increasing per-aggregate
//!   sequence number
//! - **Entity**: a read-model row keyed by aggregate id, carrying the
//!   sequence number of the last event applied to it
//! - **Processing group**: a named partition of the projection space
//!   owning one store and one set of handlers; groups are independent
//! - **Subscription query**: a standing client request that receives an
//!   initial result plus a push on every subsequent matching write
//!
//! ## Boundaries
//!
//! The durable event store, the persistent read-model storage engine, the
//! client-facing transport, and the command-side aggregates are external
//! collaborators. This crate defines only their contracts:
//! [`source::EventSource`] / [`source::EventLogReader`],
//! [`projection::ProjectionStore`], and [`sink::NotificationSink`].

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod event;
pub mod projection;
pub mod query;
pub mod sink;
pub mod source;

pub use aggregate::{AggregateId, SequenceNumber};
pub use event::{Event, EventEnvelope, EventError};
pub use projection::{
    Entity, EntityStore, GroupStatus, ProjectionError, ProjectionStore, Result,
};
pub use query::QueryFilter;
pub use sink::NotificationSink;
pub use source::{EventLogReader, EventSource, EventSourceError, EventStream};
