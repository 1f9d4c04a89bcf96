//! Typed read-model facade: queries, writes, and subscription queries.
//!
//! A [`ReadModel`] pairs a typed entity store with a subscription registry
//! for one entity type. Handlers write through it so that every live write
//! reaches subscribers; query callers read through it for point-in-time
//! results or `watch` it for live ones.

use crate::router::DispatchMode;
use crate::subscription::{Subscription, SubscriptionId, SubscriptionRegistry};
use readflow_core::aggregate::AggregateId;
use readflow_core::projection::{Entity, EntityStore, ProjectionError, ProjectionStore, Result};
use readflow_core::query::QueryFilter;
use std::sync::Arc;

/// Read-model access for one entity type.
///
/// Cloning is cheap (shared store handle and subscription registry), so
/// handlers that join across read models hold clones of each other's
/// models.
pub struct ReadModel<E: Entity> {
    store: EntityStore<E>,
    subscriptions: Arc<SubscriptionRegistry<E>>,
}

impl<E: Entity> Clone for ReadModel<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
        }
    }
}

impl<E: Entity> ReadModel<E> {
    /// Create a read model over the given store handle.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            store: EntityStore::new(store),
            subscriptions: Arc::new(SubscriptionRegistry::new()),
        }
    }

    /// Create a read model with a custom per-subscriber buffer size.
    #[must_use]
    pub fn with_subscription_capacity(store: Arc<dyn ProjectionStore>, capacity: usize) -> Self {
        Self {
            store: EntityStore::new(store),
            subscriptions: Arc::new(SubscriptionRegistry::with_capacity(capacity)),
        }
    }

    /// Fetch the entity for an aggregate id, if present.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] or
    /// [`ProjectionError::Serialization`] if the read fails.
    pub async fn try_find(&self, id: &AggregateId) -> Result<Option<E>> {
        self.store.find_by_id(id).await
    }

    /// Fetch the entity for an aggregate id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::NotFound`] if no entity exists for the
    /// id.
    pub async fn find(&self, id: &AggregateId) -> Result<E> {
        self.try_find(id)
            .await?
            .ok_or_else(|| ProjectionError::NotFound { id: id.clone() })
    }

    /// Fetch an entity that an event handler requires to already exist.
    ///
    /// Update events and write-time joins depend on prior state; its
    /// absence means an upstream ordering or delivery bug, reported as
    /// [`ProjectionError::MissingPriorState`] rather than a plain
    /// not-found.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::MissingPriorState`] if no entity exists
    /// for the id.
    pub async fn require(&self, id: &AggregateId) -> Result<E> {
        self.try_find(id)
            .await?
            .ok_or_else(|| ProjectionError::MissingPriorState { id: id.clone() })
    }

    /// Fetch all entities.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] or
    /// [`ProjectionError::Serialization`] if the read fails.
    pub async fn find_all(&self) -> Result<Vec<E>> {
        self.store.find_all().await
    }

    /// Upsert an entity and, in live mode, push it to matching
    /// subscribers.
    ///
    /// The write and the push happen atomically with respect to new
    /// subscriptions. In replay mode nothing is pushed: subscribers must
    /// not observe historical re-application as fresh updates.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Serialization`] or
    /// [`ProjectionError::Storage`] if the write fails; nothing is pushed
    /// in that case.
    pub async fn save(&self, entity: &E, mode: DispatchMode) -> Result<()> {
        match mode {
            DispatchMode::Live => {
                self.subscriptions
                    .publish_through(|| self.store.upsert(entity), entity)
                    .await
            }
            DispatchMode::Replay => self.store.upsert(entity).await,
        }
    }

    /// Push an entity to matching subscribers without writing.
    ///
    /// Used for deduplicated redeliveries: the store already holds this
    /// state, but subscribers still expect the notification. No-op in
    /// replay mode.
    pub async fn republish(&self, entity: &E, mode: DispatchMode) {
        if mode == DispatchMode::Live {
            self.subscriptions.publish(entity).await;
        }
    }

    /// Subscribe to one aggregate id: current state (if any) plus every
    /// subsequent write to it.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] or
    /// [`ProjectionError::Serialization`] if the snapshot read fails; no
    /// subscription is registered in that case.
    pub async fn watch(&self, id: AggregateId) -> Result<(Option<E>, Subscription<E>)> {
        let filter = QueryFilter::ById(id.clone());
        self.subscriptions
            .subscribe(filter, || self.store.find_by_id(&id))
            .await
    }

    /// Subscribe to the whole collection: all current entities plus every
    /// subsequent write.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] or
    /// [`ProjectionError::Serialization`] if the snapshot read fails; no
    /// subscription is registered in that case.
    pub async fn watch_all(&self) -> Result<(Vec<E>, Subscription<E>)> {
        self.subscriptions
            .subscribe(QueryFilter::All, || self.store.find_all())
            .await
    }

    /// Cancel an active subscription. Idempotent.
    pub async fn cancel(&self, id: SubscriptionId) {
        self.subscriptions.cancel(id).await;
    }
}
