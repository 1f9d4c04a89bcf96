//! Courier order read model (processing group `"courierorder"`).
//!
//! `NotAssigned` is the no-op mutation case: the store is not written,
//! but the current entity is still pushed to subscribers so live queries
//! observe the freshest state after every event.

use crate::courier::CourierEntity;
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
pub const GROUP: &str = "courierorder";

/// Event types consumed by this group.
pub const EVENT_TYPES: &[&str] = &[
    "CourierOrderCreated.v1",
    "CourierOrderAssigned.v1",
    "CourierOrderNotAssigned.v1",
    "CourierOrderDelivered.v1",
];

/// Events of the courier order aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CourierOrderEvent {
    /// A delivery task was opened.
    Created,
    /// A courier took the delivery.
    Assigned {
        /// Id of the assigned courier.
        courier_id: AggregateId,
    },
    /// Assignment was attempted and declined; state is unchanged.
    NotAssigned,
    /// The delivery was completed.
    Delivered,
}

impl Event for CourierOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created => "CourierOrderCreated.v1",
            Self::Assigned { .. } => "CourierOrderAssigned.v1",
            Self::NotAssigned => "CourierOrderNotAssigned.v1",
            Self::Delivered => "CourierOrderDelivered.v1",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "courier-order"
    }
}

/// Delivery state of a courier order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourierOrderState {
    /// Awaiting a courier.
    Created,
    /// A courier is on it.
    Assigned,
    /// Delivered.
    Delivered,
}

/// A courier order row in the read model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourierOrderEntity {
    /// Courier order aggregate id.
    pub id: AggregateId,
    /// Sequence number of the last applied event.
    pub aggregate_version: SequenceNumber,
    /// Snapshot of the assigned courier, if any.
    pub courier: Option<CourierEntity>,
    /// Delivery state.
    pub state: CourierOrderState,
}

impl Entity for CourierOrderEntity {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn aggregate_version(&self) -> SequenceNumber {
        self.aggregate_version
    }
}

/// Projects courier order events and answers the delivery-side queries.
pub struct CourierOrderProjection {
    model: ReadModel<CourierOrderEntity>,
    couriers: ReadModel<CourierEntity>,
}

impl CourierOrderProjection {
    /// Create the projection over the group's store and the courier read
    /// model it joins against.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>, couriers: ReadModel<CourierEntity>) -> Self {
        Self {
            model: ReadModel::new(store),
            couriers,
        }
    }

    /// A handle to the underlying read model.
    #[must_use]
    pub fn model(&self) -> ReadModel<CourierOrderEntity> {
        self.model.clone()
    }

    /// Point query by courier order id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](readflow_core::projection::ProjectionError::NotFound)
    /// for an unknown id.
    pub async fn courier_order(&self, id: &AggregateId) -> Result<CourierOrderEntity> {
        self.model.find(id).await
    }

    /// All courier orders.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the read fails.
    pub async fn courier_orders(&self) -> Result<Vec<CourierOrderEntity>> {
        self.model.find_all().await
    }

    /// Live query for one courier order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_courier_order(
        &self,
        id: AggregateId,
    ) -> Result<(Option<CourierOrderEntity>, Subscription<CourierOrderEntity>)> {
        self.model.watch(id).await
    }

    /// Live query for the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_courier_orders(
        &self,
    ) -> Result<(Vec<CourierOrderEntity>, Subscription<CourierOrderEntity>)> {
        self.model.watch_all().await
    }

    async fn apply_event(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        let event: CourierOrderEvent = decode(envelope)?;

        // NotAssigned never writes, so it bypasses the version dedup and
        // simply re-announces the current state.
        if matches!(event, CourierOrderEvent::NotAssigned) {
            let entity = self.model.require(&envelope.aggregate_id).await?;
            self.model.republish(&entity, mode).await;
            return Ok(());
        }

        if already_applied(&self.model, envelope, mode).await? {
            return Ok(());
        }

        let entity = match event {
            CourierOrderEvent::Created => CourierOrderEntity {
                id: envelope.aggregate_id.clone(),
                aggregate_version: envelope.sequence_number,
                courier: None,
                state: CourierOrderState::Created,
            },
            CourierOrderEvent::Assigned { courier_id } => {
                let mut entity = self.model.require(&envelope.aggregate_id).await?;
                let courier = self.couriers.require(&courier_id).await?;
                entity.courier = Some(courier);
                entity.state = CourierOrderState::Assigned;
                entity.aggregate_version = envelope.sequence_number;
                entity
            }
            CourierOrderEvent::Delivered => {
                let mut entity = self.model.require(&envelope.aggregate_id).await?;
                entity.state = CourierOrderState::Delivered;
                entity.aggregate_version = envelope.sequence_number;
                entity
            }
            // Handled above.
            CourierOrderEvent::NotAssigned => return Ok(()),
        };

        self.model.save(&entity, mode).await
    }
}

impl ProjectionHandler for CourierOrderProjection {
    fn aggregate_type(&self) -> &'static str {
        "courier-order"
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
