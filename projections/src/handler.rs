//! Shared plumbing for the projection handlers.

use readflow_core::event::{Event, EventEnvelope};
use readflow_core::projection::{Entity, ProjectionError, Result};
use readflow_engine::read_model::ReadModel;
use readflow_engine::router::DispatchMode;
use serde::de::DeserializeOwned;

/// Decode an envelope payload into a concrete event enum.
pub(crate) fn decode<E>(envelope: &EventEnvelope) -> Result<E>
where
    E: Event + DeserializeOwned,
{
    E::from_bytes(&envelope.data).map_err(|e| ProjectionError::Serialization(e.to_string()))
}

/// At-least-once dedup: an envelope whose sequence number is at or below
/// the stored `aggregate_version` has already been applied.
///
/// Returns `true` when the event is a redelivery. The store is left
/// untouched, but the current entity is still republished so subscribers
/// observe the freshest state even across redeliveries.
pub(crate) async fn already_applied<E: Entity>(
    model: &ReadModel<E>,
    envelope: &EventEnvelope,
    mode: DispatchMode,
) -> Result<bool> {
    if let Some(existing) = model.try_find(&envelope.aggregate_id).await? {
        if envelope.sequence_number <= existing.aggregate_version() {
            tracing::debug!(
                aggregate_id = %envelope.aggregate_id,
                sequence_number = %envelope.sequence_number,
                stored_version = %existing.aggregate_version(),
                event_type = %envelope.event_type,
                "Skipping already-applied event"
            );
            model.republish(&existing, mode).await;
            return Ok(true);
        }
    }
    Ok(false)
}
