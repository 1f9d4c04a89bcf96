//! Subscription queries: initial result plus a live update stream.
//!
//! # Overview
//!
//! A subscription query answers once from the current read model, then
//! pushes every subsequent matching write to the subscriber:
//!
//! ```text
//! subscribe(filter) ──▶ snapshot (initial result)
//!                       + Subscription (update receiver)
//!
//! handler write ──▶ publish_through ──▶ matching subscribers
//! ```
//!
//! # No-loss guarantee
//!
//! The registry serializes snapshot reads, subscriber registration, and
//! publishes behind one async mutex. A subscriber therefore observes every
//! update committed after its snapshot, exactly once, in write order:
//! there is no window where a write lands between the snapshot and the
//! registration, and no way for a subscriber to be pushed a write its
//! snapshot already contained.
//!
//! # Backpressure
//!
//! Each subscriber gets a bounded buffer (16 updates by default). A full
//! buffer drops the update for that subscriber with a warning rather than
//! blocking event processing; a closed receiver removes the subscriber.

use readflow_core::projection::{Entity, Result};
use readflow_core::query::QueryFilter;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Default per-subscriber update buffer size.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 16;

/// Handle identifying an active subscription for cancellation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The update stream side of a subscription query.
///
/// Dropping the subscription closes the channel; the registry removes the
/// subscriber on the next matching publish.
pub struct Subscription<E> {
    id: SubscriptionId,
    updates: mpsc::Receiver<E>,
}

impl<E> Subscription<E> {
    /// The id to pass to [`SubscriptionRegistry::cancel`].
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next update, or `None` once the subscription is
    /// cancelled and the buffer is drained.
    pub async fn next(&mut self) -> Option<E> {
        self.updates.recv().await
    }

    /// Receive the next already-buffered update without waiting.
    pub fn try_next(&mut self) -> Option<E> {
        self.updates.try_recv().ok()
    }
}

struct ActiveSubscription<E> {
    id: SubscriptionId,
    filter: QueryFilter,
    sender: mpsc::Sender<E>,
}

struct Inner<E> {
    next_id: u64,
    active: Vec<ActiveSubscription<E>>,
}

/// Registry of active subscription queries for one entity type.
///
/// Each [`ReadModel`](crate::read_model::ReadModel) owns one registry.
/// All mutation of the subscriber list and all publishes go through a
/// single async mutex; see the module docs for the ordering guarantee
/// this buys.
pub struct SubscriptionRegistry<E> {
    inner: tokio::sync::Mutex<Inner<E>>,
    capacity: usize,
}

impl<E> Default for SubscriptionRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SubscriptionRegistry<E> {
    /// Create a registry with the default per-subscriber buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIPTION_CAPACITY)
    }

    /// Create a registry with a custom per-subscriber buffer size.
    ///
    /// A `capacity` of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Inner {
                next_id: 0,
                active: Vec::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Number of currently registered subscribers.
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.active.len()
    }

    /// Remove a subscription. Idempotent; unknown ids are ignored.
    pub async fn cancel(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock().await;
        inner.active.retain(|sub| sub.id != id);
    }
}

impl<E: Entity> SubscriptionRegistry<E> {
    /// Register a subscription: take a snapshot of the current result and
    /// start receiving every subsequent matching update.
    ///
    /// The `snapshot` closure runs while the registry is locked, so no
    /// publish can interleave between the snapshot and the registration.
    ///
    /// # Errors
    ///
    /// Propagates the snapshot's error; no subscription is registered in
    /// that case.
    pub async fn subscribe<T, F, Fut>(
        &self,
        filter: QueryFilter,
        snapshot: F,
    ) -> Result<(T, Subscription<E>)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut inner = self.inner.lock().await;
        let initial = snapshot().await?;

        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;

        let (sender, updates) = mpsc::channel(self.capacity);
        inner.active.push(ActiveSubscription { id, filter, sender });

        tracing::debug!(subscription = %id, "Subscription registered");
        Ok((initial, Subscription { id, updates }))
    }

    /// Push an entity to every subscriber whose filter matches, without an
    /// accompanying store write.
    ///
    /// Used when a handler deduplicates a redelivered event: the store is
    /// already current but subscribers still get the push.
    pub async fn publish(&self, entity: &E) {
        let mut inner = self.inner.lock().await;
        Self::fan_out(&mut inner, entity);
    }

    /// Run a store write and push the written entity to matching
    /// subscribers, atomically with respect to `subscribe`.
    ///
    /// Holding the lock across the write closes the race where a new
    /// subscriber snapshots the post-write state and then also receives
    /// the push for the same write.
    ///
    /// # Errors
    ///
    /// Propagates the write's error; nothing is pushed in that case.
    pub async fn publish_through<F, Fut>(&self, write: F, entity: &E) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut inner = self.inner.lock().await;
        write().await?;
        Self::fan_out(&mut inner, entity);
        Ok(())
    }

    fn fan_out(inner: &mut Inner<E>, entity: &E) {
        inner.active.retain(|sub| {
            if !sub.filter.matches(entity.aggregate_id()) {
                return true;
            }
            match sub.sender.try_send(entity.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscription = %sub.id,
                        aggregate_id = %entity.aggregate_id(),
                        "Subscriber buffer full, dropping update"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscription = %sub.id, "Subscriber gone, removing");
                    false
                }
            }
        });
    }
}
