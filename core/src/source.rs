//! Event source boundary: live subscriptions and historical log reads.
//!
//! The durable event store is an external collaborator. The engine consumes
//! it through two narrow contracts:
//!
//! - [`EventSource`]: an ordered, at-least-once live stream per aggregate
//!   type, feeding the live ingestion pipeline
//! - [`EventLogReader`]: a finite, ordered read of the full historical log
//!   for an aggregate type, feeding replays
//!
//! Both deliver [`EventEnvelope`] records with strictly increasing
//! per-aggregate sequence numbers.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//!
//! let mut stream = source.subscribe(&["order"]).await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(envelope) => coordinator.ingest("order", &envelope).await?,
//!         Err(e) => tracing::error!("Event stream error: {e}"),
//!     }
//! }
//! ```

use crate::event::EventEnvelope;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur at the event source boundary.
#[derive(Error, Debug, Clone)]
pub enum EventSourceError {
    /// Failed to connect to the event source.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to subscribe to aggregate types.
    #[error("Subscription failed for aggregate types {aggregate_types:?}: {reason}")]
    SubscriptionFailed {
        /// The aggregate types that failed to subscribe.
        aggregate_types: Vec<String>,
        /// The reason for failure.
        reason: String,
    },

    /// Failed to read the historical event log.
    #[error("Log read failed for aggregate type '{aggregate_type}': {reason}")]
    ReadFailed {
        /// The aggregate type whose log read failed.
        aggregate_type: String,
        /// The reason for failure.
        reason: String,
    },

    /// Network or transport error.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Generic error for other failures.
    #[error("Event source error: {0}")]
    Other(String),
}

/// Stream of event envelopes from a subscription or log read.
pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<EventEnvelope, EventSourceError>> + Send>>;

/// Live event delivery for one or more aggregate types.
///
/// Delivery is ordered per aggregate and at-least-once: the engine's
/// handlers deduplicate redeliveries by comparing the envelope's sequence
/// number against the entity's `aggregate_version`.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` to
/// enable trait object usage (`Arc<dyn EventSource>`).
pub trait EventSource: Send + Sync {
    /// Subscribe to the live event stream of the given aggregate types.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::SubscriptionFailed`] if subscription
    /// fails.
    fn subscribe(
        &self,
        aggregate_types: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventSourceError>> + Send + '_>>;
}

/// Historical event log access for replays.
///
/// `read_all` yields the complete, finite, ordered event sequence for one
/// aggregate type from the beginning of time. The replay coordinator
/// streams it through the router in replay mode to rebuild a processing
/// group's read model from empty.
pub trait EventLogReader: Send + Sync {
    /// Read the full ordered event log for an aggregate type.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::ReadFailed`] if the log cannot be read.
    fn read_all(
        &self,
        aggregate_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventSourceError>> + Send + '_>>;
}
