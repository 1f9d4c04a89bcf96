//! Projection storage contract, entity trait, and the engine error taxonomy.
//!
//! # Overview
//!
//! Projections are the **query side of CQRS**: handlers consume events and
//! maintain denormalized entities optimized for querying. This module
//! defines what the engine needs from its surroundings to do that:
//!
//! - [`ProjectionStore`]: the keyed-entity storage boundary (the real
//!   backend, Postgres or Redis or anything with keyed upsert, is an
//!   external collaborator; this trait is the contract)
//! - [`Entity`]: what a read-model row must expose (its key and the
//!   sequence number of the last event applied to it)
//! - [`EntityStore`]: a typed adapter over a store handle so handlers never
//!   touch raw bytes
//! - [`ProjectionError`] / [`GroupStatus`]: the error taxonomy and the
//!   externally observable readiness state of a processing group
//!
//! # Consistency invariant
//!
//! For any entity, `aggregate_version()` equals the sequence number of the
//! most recently applied event for that aggregate id. Writes are idempotent
//! upserts keyed by id; applying the same event sequence to an empty store
//! always converges to the same entities.

use crate::aggregate::{AggregateId, SequenceNumber};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Error type for projection operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// Point query for an id with no entity. Reported to the caller, not
    /// fatal.
    #[error("Entity not found: {id}")]
    NotFound {
        /// The aggregate id that did not resolve.
        id: AggregateId,
    },

    /// An update event arrived for an aggregate id with no existing entity
    /// (or a write-time join referenced an absent entity). This signals an
    /// out-of-order or lost-creation-event bug upstream and is surfaced
    /// loudly; processing of the event aborts and the store is unchanged.
    #[error("Update event arrived before prior state for aggregate '{id}'")]
    MissingPriorState {
        /// The aggregate id whose prior state was expected.
        id: AggregateId,
    },

    /// No handler in the processing group is registered for the event type.
    /// Logged and non-fatal; the event is dropped for that group.
    #[error("No handler registered for event type '{event_type}' in group '{group}'")]
    UnroutableEvent {
        /// The processing group that received the event.
        group: String,
        /// The event type with zero registrations.
        event_type: String,
    },

    /// A live event arrived while the group was resetting or replaying.
    /// The caller is responsible for redelivering it later.
    #[error("Processing group '{group}' is busy ({status})")]
    GroupBusy {
        /// The busy processing group.
        group: String,
        /// The group status at the time of rejection.
        status: GroupStatus,
    },

    /// Replay aborted mid-stream. The group remains in the `Replaying`
    /// state and must be rebuilt from the beginning.
    #[error("Replay of group '{group}' did not complete: {reason}")]
    ReplayIncomplete {
        /// The group whose replay aborted.
        group: String,
        /// What went wrong.
        reason: String,
    },

    /// The named processing group is not registered with the coordinator.
    #[error("Unknown processing group: {0}")]
    UnknownGroup(String),

    /// Event source boundary error (connection, subscription, or log read).
    #[error("Event source error: {0}")]
    Source(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity or event payload serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Readiness state of a processing group.
///
/// A group only serves live traffic while `Idle`. Any other state means its
/// read model must not be treated as complete. The state machine is
/// `Idle → Resetting → Replaying → Idle`; a failed replay leaves the group
/// `Replaying` until it is rebuilt from the beginning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, serde::Deserialize)]
pub enum GroupStatus {
    /// Serving live traffic; the read model is complete.
    Idle,
    /// The group store is being cleared ahead of a replay.
    Resetting,
    /// Historical events are being re-applied (or a replay failed and must
    /// be retried).
    Replaying,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resetting => write!(f, "resetting"),
            Self::Replaying => write!(f, "replaying"),
        }
    }
}

/// Keyed-entity storage backing one processing group.
///
/// Each processing group owns exactly one store; resetting one group never
/// affects another. The real storage engine is an external collaborator;
/// this trait is the boundary contract it must satisfy:
///
/// - `upsert` is idempotent and keyed by id
/// - `find_by_id` distinguishes "absent" (`Ok(None)`) from an error
/// - `find_all` returns an empty collection for an empty store
/// - `delete_all` clears the group's entire projection space
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` to enable trait object usage (`Arc<dyn ProjectionStore>`).
/// Store handles are injected into handlers at construction, so tests can
/// substitute an in-memory store per group.
pub trait ProjectionStore: Send + Sync {
    /// Insert or update the serialized entity stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the write fails.
    fn upsert(
        &self,
        id: &str,
        data: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Fetch the serialized entity stored under `id`.
    ///
    /// Returns `Ok(None)` when no entity exists for the id; absence is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the read fails.
    fn find_by_id(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + '_>>;

    /// Fetch all stored entities as `(id, bytes)` pairs.
    ///
    /// Returns an empty vector for an empty store. No ordering is
    /// guaranteed by the contract.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the read fails.
    fn find_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<(String, Vec<u8>)>>> + Send + '_>>;

    /// Delete every entity in the store.
    ///
    /// Invoked by the replay coordinator ahead of a replay; must complete
    /// (or fail without partial effect) before any replay event is
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the deletion fails.
    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// A read-model row.
///
/// Entities are keyed by the aggregate id (unique per store) and carry the
/// sequence number of the last event applied to them. They are created on
/// the first event for an aggregate id, mutated on each subsequent matching
/// event, and destroyed only by a group-wide reset.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The aggregate id this entity is keyed by.
    fn aggregate_id(&self) -> &AggregateId;

    /// Sequence number of the last event applied to this entity.
    fn aggregate_version(&self) -> SequenceNumber;
}

/// Typed adapter over a [`ProjectionStore`] handle.
///
/// Handlers work with concrete entity types; the store works with bytes.
/// `EntityStore` bridges the two with bincode, keeping serialization out of
/// handler code.
///
/// Cloning is cheap (shared store handle).
pub struct EntityStore<E> {
    store: Arc<dyn ProjectionStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    /// Create a typed store over the given store handle.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Insert or update an entity, keyed by its aggregate id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Serialization`] if encoding fails, or
    /// [`ProjectionError::Storage`] if the write fails.
    pub async fn upsert(&self, entity: &E) -> Result<()> {
        let bytes = bincode::serialize(entity)
            .map_err(|e| ProjectionError::Serialization(e.to_string()))?;
        self.store.upsert(entity.aggregate_id().as_str(), &bytes).await
    }

    /// Fetch the entity for an aggregate id, if present.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the read fails, or
    /// [`ProjectionError::Serialization`] if the stored bytes do not decode.
    pub async fn find_by_id(&self, id: &AggregateId) -> Result<Option<E>> {
        match self.store.find_by_id(id.as_str()).await? {
            Some(bytes) => {
                let entity = bincode::deserialize(&bytes)
                    .map_err(|e| ProjectionError::Serialization(e.to_string()))?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    /// Fetch all entities in the store.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the read fails, or
    /// [`ProjectionError::Serialization`] if any stored bytes do not decode.
    pub async fn find_all(&self) -> Result<Vec<E>> {
        let rows = self.store.find_all().await?;
        rows.into_iter()
            .map(|(_, bytes)| {
                bincode::deserialize(&bytes)
                    .map_err(|e| ProjectionError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Delete every entity in the store.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the deletion fails.
    pub async fn delete_all(&self) -> Result<()> {
        self.store.delete_all().await
    }
}
