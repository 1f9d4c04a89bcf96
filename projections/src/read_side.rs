//! The assembled read side: all six processing groups behind one facade.

use crate::broadcast::UpdateBroadcaster;
use crate::courier::{self, CourierProjection};
use crate::courier_order::{self, CourierOrderProjection};
use crate::customer::{self, CustomerProjection};
use crate::order::{self, OrderProjection};
use crate::restaurant::{self, RestaurantProjection};
use crate::restaurant_order::{self, RestaurantOrderProjection};
use readflow_core::event::EventEnvelope;
use readflow_core::projection::{GroupStatus, ProjectionStore, Result};
use readflow_core::sink::NotificationSink;
use readflow_core::source::EventLogReader;
use readflow_engine::coordinator::ReplayCoordinator;
use readflow_engine::group::ProcessingGroup;
use readflow_engine::router::{EventRouter, ProjectionHandler};
use std::sync::Arc;

/// Topic for order updates.
pub const ORDERS_TOPIC: &str = "orders.updates";
/// Topic for restaurant updates.
pub const RESTAURANTS_TOPIC: &str = "restaurants.updates";
/// Topic for courier updates.
pub const COURIERS_TOPIC: &str = "couriers.updates";
/// Topic for courier order updates.
pub const COURIER_ORDERS_TOPIC: &str = "couriers/orders.updates";

/// The complete read side: six processing groups, their read models, the
/// outbound broadcasters, and one replay coordinator.
///
/// Each group gets its own store from the injected factory, so resets stay
/// isolated per group. The order, restaurant order, and courier order
/// handlers hold read-model handles of the groups they join against.
///
/// # Example
///
/// ```ignore
/// let read_side = ReadSide::new(
///     |_group| Arc::new(PostgresProjectionStore::new(pool.clone())),
///     Arc::new(websocket_sink),
/// );
///
/// read_side.ingest(order::GROUP, &envelope).await?;
/// let order = read_side.orders().order(&order_id).await?;
/// ```
pub struct ReadSide {
    coordinator: Arc<ReplayCoordinator>,
    customers: Arc<CustomerProjection>,
    couriers: Arc<CourierProjection>,
    restaurants: Arc<RestaurantProjection>,
    orders: Arc<OrderProjection>,
    restaurant_orders: Arc<RestaurantOrderProjection>,
    courier_orders: Arc<CourierOrderProjection>,
}

impl ReadSide {
    /// Assemble the read side.
    ///
    /// `store_for` is called once per processing group with the group name
    /// and must return that group's dedicated store. `sink` receives the
    /// outbound update broadcasts.
    pub fn new<F>(store_for: F, sink: Arc<dyn NotificationSink>) -> Self
    where
        F: Fn(&str) -> Arc<dyn ProjectionStore>,
    {
        let customer_store = store_for(customer::GROUP);
        let courier_store = store_for(courier::GROUP);
        let restaurant_store = store_for(restaurant::GROUP);
        let order_store = store_for(order::GROUP);
        let restaurant_order_store = store_for(restaurant_order::GROUP);
        let courier_order_store = store_for(courier_order::GROUP);

        let customers = Arc::new(CustomerProjection::new(Arc::clone(&customer_store)));
        let couriers = Arc::new(CourierProjection::new(Arc::clone(&courier_store)));
        let restaurants = Arc::new(RestaurantProjection::new(Arc::clone(&restaurant_store)));
        let orders = Arc::new(OrderProjection::new(
            Arc::clone(&order_store),
            customers.model(),
            restaurants.model(),
        ));
        let restaurant_orders = Arc::new(RestaurantOrderProjection::new(
            Arc::clone(&restaurant_order_store),
            restaurants.model(),
        ));
        let courier_orders = Arc::new(CourierOrderProjection::new(
            Arc::clone(&courier_order_store),
            couriers.model(),
        ));

        let mut coordinator = ReplayCoordinator::new();
        coordinator.register(ProcessingGroup::new(
            customer::GROUP,
            EventRouter::new(customer::GROUP)
                .with_handler(Arc::clone(&customers) as Arc<dyn ProjectionHandler>),
            customer_store,
        ));
        coordinator.register(ProcessingGroup::new(
            courier::GROUP,
            EventRouter::new(courier::GROUP)
                .with_handler(Arc::clone(&couriers) as Arc<dyn ProjectionHandler>)
                .with_handler(Arc::new(UpdateBroadcaster::new(
                    "courier",
                    courier::EVENT_TYPES,
                    COURIERS_TOPIC,
                    Arc::clone(&sink),
                ))),
            courier_store,
        ));
        coordinator.register(ProcessingGroup::new(
            restaurant::GROUP,
            EventRouter::new(restaurant::GROUP)
                .with_handler(Arc::clone(&restaurants) as Arc<dyn ProjectionHandler>)
                .with_handler(Arc::new(UpdateBroadcaster::new(
                    "restaurant",
                    restaurant::EVENT_TYPES,
                    RESTAURANTS_TOPIC,
                    Arc::clone(&sink),
                ))),
            restaurant_store,
        ));
        coordinator.register(ProcessingGroup::new(
            order::GROUP,
            EventRouter::new(order::GROUP)
                .with_handler(Arc::clone(&orders) as Arc<dyn ProjectionHandler>)
                .with_handler(Arc::new(UpdateBroadcaster::new(
                    "order",
                    order::EVENT_TYPES,
                    ORDERS_TOPIC,
                    Arc::clone(&sink),
                ))),
            order_store,
        ));
        coordinator.register(ProcessingGroup::new(
            restaurant_order::GROUP,
            EventRouter::new(restaurant_order::GROUP)
                .with_handler(Arc::clone(&restaurant_orders) as Arc<dyn ProjectionHandler>),
            restaurant_order_store,
        ));
        coordinator.register(ProcessingGroup::new(
            courier_order::GROUP,
            EventRouter::new(courier_order::GROUP)
                .with_handler(Arc::clone(&courier_orders) as Arc<dyn ProjectionHandler>)
                .with_handler(Arc::new(UpdateBroadcaster::new(
                    "courier-order",
                    courier_order::EVENT_TYPES,
                    COURIER_ORDERS_TOPIC,
                    sink,
                ))),
            courier_order_store,
        ));

        Self {
            coordinator: Arc::new(coordinator),
            customers,
            couriers,
            restaurants,
            orders,
            restaurant_orders,
            courier_orders,
        }
    }

    /// The replay coordinator, shared for wiring ingestion pipelines.
    #[must_use]
    pub fn coordinator(&self) -> Arc<ReplayCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Customer queries.
    #[must_use]
    pub fn customers(&self) -> &CustomerProjection {
        &self.customers
    }

    /// Courier queries.
    #[must_use]
    pub fn couriers(&self) -> &CourierProjection {
        &self.couriers
    }

    /// Restaurant queries.
    #[must_use]
    pub fn restaurants(&self) -> &RestaurantProjection {
        &self.restaurants
    }

    /// Order queries.
    #[must_use]
    pub fn orders(&self) -> &OrderProjection {
        &self.orders
    }

    /// Restaurant order queries.
    #[must_use]
    pub fn restaurant_orders(&self) -> &RestaurantOrderProjection {
        &self.restaurant_orders
    }

    /// Courier order queries.
    #[must_use]
    pub fn courier_orders(&self) -> &CourierOrderProjection {
        &self.courier_orders
    }

    /// Apply a live event to a processing group.
    ///
    /// # Errors
    ///
    /// See [`ReplayCoordinator::ingest`].
    pub async fn ingest(&self, group: &str, envelope: &EventEnvelope) -> Result<()> {
        self.coordinator.ingest(group, envelope).await
    }

    /// The readiness state of a processing group.
    ///
    /// # Errors
    ///
    /// See [`ReplayCoordinator::status`].
    pub fn status(&self, group: &str) -> Result<GroupStatus> {
        self.coordinator.status(group)
    }

    /// Clear a group's store ahead of a replay.
    ///
    /// # Errors
    ///
    /// See [`ReplayCoordinator::trigger_reset`].
    pub async fn trigger_reset(&self, group: &str) -> Result<()> {
        self.coordinator.trigger_reset(group).await
    }

    /// Re-apply the full historical log to a freshly reset group.
    ///
    /// # Errors
    ///
    /// See [`ReplayCoordinator::replay`].
    pub async fn replay(&self, group: &str, reader: &dyn EventLogReader) -> Result<()> {
        self.coordinator.replay(group, reader).await
    }

    /// Reset and replay a group in one call.
    ///
    /// # Errors
    ///
    /// See [`ReplayCoordinator::rebuild`].
    pub async fn rebuild(&self, group: &str, reader: &dyn EventLogReader) -> Result<()> {
        self.coordinator.rebuild(group, reader).await
    }
}
