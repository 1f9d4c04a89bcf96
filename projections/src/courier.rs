//! Courier read model (processing group `"courier"`).

use crate::handler::{already_applied, decode};
use readflow_core::aggregate::{AggregateId, SequenceNumber};
use readflow_core::event::{Event, EventEnvelope};
use readflow_core::projection::{Entity, ProjectionStore, Result};
use readflow_engine::read_model::ReadModel;
use readflow_engine::router::{DispatchMode, ProjectionHandler};
use readflow_engine::subscription::Subscription;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Processing group name.
pub const GROUP: &str = "courier";

/// Event types consumed by this group.
pub const EVENT_TYPES: &[&str] = &["CourierCreated.v1"];

/// Events of the courier aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CourierEvent {
    /// A courier was registered.
    Created {
        /// Courier's first name.
        first_name: String,
        /// Courier's last name.
        last_name: String,
        /// How many orders the courier may carry at once.
        max_active_orders: u32,
    },
}

impl Event for CourierEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "CourierCreated.v1",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "courier"
    }
}

/// A courier row in the read model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierEntity {
    /// Courier aggregate id.
    pub id: AggregateId,
    /// Sequence number of the last applied event.
    pub aggregate_version: SequenceNumber,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// How many orders the courier may carry at once.
    pub max_active_orders: u32,
}

impl Entity for CourierEntity {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn aggregate_version(&self) -> SequenceNumber {
        self.aggregate_version
    }
}

/// Projects courier events and answers courier queries.
pub struct CourierProjection {
    model: ReadModel<CourierEntity>,
}

impl CourierProjection {
    /// Create the projection over the group's store.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            model: ReadModel::new(store),
        }
    }

    /// A handle to the underlying read model, for cross-group joins.
    #[must_use]
    pub fn model(&self) -> ReadModel<CourierEntity> {
        self.model.clone()
    }

    /// Point query by courier id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](readflow_core::projection::ProjectionError::NotFound)
    /// for an unknown id.
    pub async fn courier(&self, id: &AggregateId) -> Result<CourierEntity> {
        self.model.find(id).await
    }

    /// All couriers.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the read fails.
    pub async fn couriers(&self) -> Result<Vec<CourierEntity>> {
        self.model.find_all().await
    }

    /// Live query for one courier.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_courier(
        &self,
        id: AggregateId,
    ) -> Result<(Option<CourierEntity>, Subscription<CourierEntity>)> {
        self.model.watch(id).await
    }

    /// Live query for the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_couriers(&self) -> Result<(Vec<CourierEntity>, Subscription<CourierEntity>)> {
        self.model.watch_all().await
    }

    async fn apply_event(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        if already_applied(&self.model, envelope, mode).await? {
            return Ok(());
        }

        let CourierEvent::Created {
            first_name,
            last_name,
            max_active_orders,
        } = decode(envelope)?;

        let entity = CourierEntity {
            id: envelope.aggregate_id.clone(),
            aggregate_version: envelope.sequence_number,
            first_name,
            last_name,
            max_active_orders,
        };
        self.model.save(&entity, mode).await
    }
}

impl ProjectionHandler for CourierProjection {
    fn aggregate_type(&self) -> &'static str {
        "courier"
    }

    fn event_types(&self) -> &'static [&'static str] {
        EVENT_TYPES
    }

    fn apply<'a>(
        &'a self,
        envelope: &'a EventEnvelope,
        mode: DispatchMode,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.apply_event(envelope, mode))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Panics: Test will fail if projection operations fail
mod tests {
    use super::*;
    use readflow_testing::store::InMemoryProjectionStore;

    fn created(id: &str, seq: u64) -> EventEnvelope {
        EventEnvelope::from_event(
            AggregateId::new(id),
            SequenceNumber::new(seq),
            &CourierEvent::Created {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                max_active_orders: 5,
            },
        )
        .expect("envelope should serialize")
    }

    #[tokio::test]
    async fn creation_event_materializes_the_entity() {
        let projection = CourierProjection::new(Arc::new(InMemoryProjectionStore::new()));

        projection
            .apply(&created("courier-1", 1), DispatchMode::Live)
            .await
            .expect("apply should succeed");

        let entity = projection
            .courier(&AggregateId::new("courier-1"))
            .await
            .expect("courier should exist");
        assert_eq!(entity.max_active_orders, 5);
        assert_eq!(entity.aggregate_version, SequenceNumber::INITIAL);
    }

    #[tokio::test]
    async fn collection_watcher_sees_each_new_courier() {
        let projection = CourierProjection::new(Arc::new(InMemoryProjectionStore::new()));
        let (initial, mut sub) = projection
            .watch_couriers()
            .await
            .expect("watch should succeed");
        assert!(initial.is_empty());

        projection
            .apply(&created("courier-1", 1), DispatchMode::Live)
            .await
            .expect("apply should succeed");
        projection
            .apply(&created("courier-2", 1), DispatchMode::Live)
            .await
            .expect("apply should succeed");

        let first = sub.next().await.expect("first update");
        let second = sub.next().await.expect("second update");
        assert_eq!(first.id, AggregateId::new("courier-1"));
        assert_eq!(second.id, AggregateId::new("courier-2"));
    }
}
