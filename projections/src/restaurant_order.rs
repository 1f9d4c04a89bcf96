//! Restaurant order read model (processing group `"restaurantorder"`).
//!
//! The restaurant snapshot is joined in at creation time: a restaurant
//! order for an unknown restaurant is an upstream bug, surfaced as
//! `MissingPriorState` exactly like a missing prior entity.

use crate::handler::{already_applied, decode};
use crate::model::RestaurantOrderLineItem;
use crate::restaurant::RestaurantEntity;
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
pub const GROUP: &str = "restaurantorder";

/// Event types consumed by this group.
pub const EVENT_TYPES: &[&str] = &["RestaurantOrderCreated.v1", "RestaurantOrderPrepared.v1"];

/// Events of the restaurant order aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RestaurantOrderEvent {
    /// A kitchen ticket was opened for a restaurant.
    Created {
        /// The restaurant that will prepare the order.
        restaurant_id: AggregateId,
        /// Items to prepare.
        line_items: Vec<RestaurantOrderLineItem>,
    },
    /// The kitchen finished preparing the order.
    Prepared,
}

impl Event for RestaurantOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "RestaurantOrderCreated.v1",
            Self::Prepared => "RestaurantOrderPrepared.v1",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "restaurant-order"
    }
}

/// Preparation state of a restaurant order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestaurantOrderState {
    /// Ticket opened.
    Created,
    /// Preparation finished.
    Prepared,
}

/// A restaurant order row in the read model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantOrderEntity {
    /// Restaurant order aggregate id.
    pub id: AggregateId,
    /// Sequence number of the last applied event.
    pub aggregate_version: SequenceNumber,
    /// Items to prepare.
    pub line_items: Vec<RestaurantOrderLineItem>,
    /// Snapshot of the preparing restaurant, embedded at creation.
    pub restaurant: RestaurantEntity,
    /// Preparation state.
    pub state: RestaurantOrderState,
}

impl Entity for RestaurantOrderEntity {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn aggregate_version(&self) -> SequenceNumber {
        self.aggregate_version
    }
}

/// Projects restaurant order events and answers the kitchen-side queries.
pub struct RestaurantOrderProjection {
    model: ReadModel<RestaurantOrderEntity>,
    restaurants: ReadModel<RestaurantEntity>,
}

impl RestaurantOrderProjection {
    /// Create the projection over the group's store and the restaurant
    /// read model it joins against.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>, restaurants: ReadModel<RestaurantEntity>) -> Self {
        Self {
            model: ReadModel::new(store),
            restaurants,
        }
    }

    /// A handle to the underlying read model.
    #[must_use]
    pub fn model(&self) -> ReadModel<RestaurantOrderEntity> {
        self.model.clone()
    }

    /// Point query by restaurant order id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](readflow_core::projection::ProjectionError::NotFound)
    /// for an unknown id.
    pub async fn restaurant_order(&self, id: &AggregateId) -> Result<RestaurantOrderEntity> {
        self.model.find(id).await
    }

    /// All restaurant orders.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the read fails.
    pub async fn restaurant_orders(&self) -> Result<Vec<RestaurantOrderEntity>> {
        self.model.find_all().await
    }

    /// Live query for one restaurant order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_restaurant_order(
        &self,
        id: AggregateId,
    ) -> Result<(
        Option<RestaurantOrderEntity>,
        Subscription<RestaurantOrderEntity>,
    )> {
        self.model.watch(id).await
    }

    /// Live query for the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_restaurant_orders(
        &self,
    ) -> Result<(
        Vec<RestaurantOrderEntity>,
        Subscription<RestaurantOrderEntity>,
    )> {
        self.model.watch_all().await
    }

    async fn apply_event(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        if already_applied(&self.model, envelope, mode).await? {
            return Ok(());
        }

        let entity = match decode(envelope)? {
            RestaurantOrderEvent::Created {
                restaurant_id,
                line_items,
            } => {
                let restaurant = self.restaurants.require(&restaurant_id).await?;
                RestaurantOrderEntity {
                    id: envelope.aggregate_id.clone(),
                    aggregate_version: envelope.sequence_number,
                    line_items,
                    restaurant,
                    state: RestaurantOrderState::Created,
                }
            }
            RestaurantOrderEvent::Prepared => {
                let mut entity = self.model.require(&envelope.aggregate_id).await?;
                entity.state = RestaurantOrderState::Prepared;
                entity.aggregate_version = envelope.sequence_number;
                entity
            }
        };

        self.model.save(&entity, mode).await
    }
}

impl ProjectionHandler for RestaurantOrderProjection {
    fn aggregate_type(&self) -> &'static str {
        "restaurant-order"
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
