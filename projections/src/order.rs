//! Order read model (processing group `"order"`).
//!
//! Verification events denormalize at write time: the handler embeds a
//! snapshot of the verifying customer or restaurant, fetched from that
//! group's read model. The join is a declared read-side dependency: a
//! missing reference is `MissingPriorState`, never a silent null.

use crate::customer::CustomerEntity;
use crate::handler::{already_applied, decode};
use crate::model::OrderLineItem;
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
pub const GROUP: &str = "order";

/// Event types consumed by this group.
pub const EVENT_TYPES: &[&str] = &[
    "OrderCreationInitiated.v1",
    "OrderVerifiedByCustomer.v1",
    "OrderVerifiedByRestaurant.v1",
    "OrderPrepared.v1",
    "OrderReadyForDelivery.v1",
    "OrderDelivered.v1",
    "OrderRejected.v1",
];

/// Events of the order aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum OrderEvent {
    /// An order was placed and awaits verification.
    CreationInitiated {
        /// The ordered items.
        line_items: Vec<OrderLineItem>,
    },
    /// The customer side verified the order.
    VerifiedByCustomer {
        /// Id of the verifying customer.
        customer_id: AggregateId,
    },
    /// The restaurant side verified the order.
    VerifiedByRestaurant {
        /// Id of the verifying restaurant.
        restaurant_id: AggregateId,
    },
    /// The restaurant finished preparing the order.
    Prepared,
    /// The order is ready for courier pickup.
    ReadyForDelivery,
    /// The order reached the customer.
    Delivered,
    /// The order was rejected.
    Rejected,
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::CreationInitiated { .. } => "OrderCreationInitiated.v1",
            Self::VerifiedByCustomer { .. } => "OrderVerifiedByCustomer.v1",
            Self::VerifiedByRestaurant { .. } => "OrderVerifiedByRestaurant.v1",
            Self::Prepared => "OrderPrepared.v1",
            Self::ReadyForDelivery => "OrderReadyForDelivery.v1",
            Self::Delivered => "OrderDelivered.v1",
            Self::Rejected => "OrderRejected.v1",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "order"
    }
}

/// Lifecycle state of an order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Placed, awaiting verification.
    CreatePending,
    /// Customer verification done.
    VerifiedByCustomer,
    /// Restaurant verification done.
    VerifiedByRestaurant,
    /// Food prepared.
    Prepared,
    /// Awaiting courier pickup.
    ReadyForDelivery,
    /// Delivered to the customer.
    Delivered,
    /// Rejected.
    Rejected,
}

/// An order row in the read model.
///
/// Customer and restaurant snapshots are `None` until the respective
/// verification event embeds them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderEntity {
    /// Order aggregate id.
    pub id: AggregateId,
    /// Sequence number of the last applied event.
    pub aggregate_version: SequenceNumber,
    /// The ordered items.
    pub line_items: Vec<OrderLineItem>,
    /// Verifying customer snapshot, embedded at verification time.
    pub customer: Option<CustomerEntity>,
    /// Verifying restaurant snapshot, embedded at verification time.
    pub restaurant: Option<RestaurantEntity>,
    /// Lifecycle state.
    pub state: OrderState,
}

impl Entity for OrderEntity {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn aggregate_version(&self) -> SequenceNumber {
        self.aggregate_version
    }
}

/// Projects order events and answers order queries.
///
/// Holds read-model handles of the customer and restaurant groups for the
/// write-time verification joins.
pub struct OrderProjection {
    model: ReadModel<OrderEntity>,
    customers: ReadModel<CustomerEntity>,
    restaurants: ReadModel<RestaurantEntity>,
}

impl OrderProjection {
    /// Create the projection over the group's store and its join
    /// dependencies.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProjectionStore>,
        customers: ReadModel<CustomerEntity>,
        restaurants: ReadModel<RestaurantEntity>,
    ) -> Self {
        Self {
            model: ReadModel::new(store),
            customers,
            restaurants,
        }
    }

    /// A handle to the underlying read model.
    #[must_use]
    pub fn model(&self) -> ReadModel<OrderEntity> {
        self.model.clone()
    }

    /// Point query by order id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](readflow_core::projection::ProjectionError::NotFound)
    /// for an unknown id.
    pub async fn order(&self, id: &AggregateId) -> Result<OrderEntity> {
        self.model.find(id).await
    }

    /// All orders.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the read fails.
    pub async fn orders(&self) -> Result<Vec<OrderEntity>> {
        self.model.find_all().await
    }

    /// Live query for one order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_order(
        &self,
        id: AggregateId,
    ) -> Result<(Option<OrderEntity>, Subscription<OrderEntity>)> {
        self.model.watch(id).await
    }

    /// Live query for the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_orders(&self) -> Result<(Vec<OrderEntity>, Subscription<OrderEntity>)> {
        self.model.watch_all().await
    }

    async fn apply_event(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        if already_applied(&self.model, envelope, mode).await? {
            return Ok(());
        }

        let entity = match decode(envelope)? {
            OrderEvent::CreationInitiated { line_items } => OrderEntity {
                id: envelope.aggregate_id.clone(),
                aggregate_version: envelope.sequence_number,
                line_items,
                customer: None,
                restaurant: None,
                state: OrderState::CreatePending,
            },
            OrderEvent::VerifiedByCustomer { customer_id } => {
                let mut entity = self.model.require(&envelope.aggregate_id).await?;
                let customer = self.customers.require(&customer_id).await?;
                entity.customer = Some(customer);
                entity.state = OrderState::VerifiedByCustomer;
                entity.aggregate_version = envelope.sequence_number;
                entity
            }
            OrderEvent::VerifiedByRestaurant { restaurant_id } => {
                let mut entity = self.model.require(&envelope.aggregate_id).await?;
                let restaurant = self.restaurants.require(&restaurant_id).await?;
                entity.restaurant = Some(restaurant);
                entity.state = OrderState::VerifiedByRestaurant;
                entity.aggregate_version = envelope.sequence_number;
                entity
            }
            OrderEvent::Prepared => self.transition(envelope, OrderState::Prepared).await?,
            OrderEvent::ReadyForDelivery => {
                self.transition(envelope, OrderState::ReadyForDelivery).await?
            }
            OrderEvent::Delivered => self.transition(envelope, OrderState::Delivered).await?,
            OrderEvent::Rejected => self.transition(envelope, OrderState::Rejected).await?,
        };

        self.model.save(&entity, mode).await
    }

    async fn transition(&self, envelope: &EventEnvelope, state: OrderState) -> Result<OrderEntity> {
        let mut entity = self.model.require(&envelope.aggregate_id).await?;
        entity.state = state;
        entity.aggregate_version = envelope.sequence_number;
        Ok(entity)
    }
}

impl ProjectionHandler for OrderProjection {
    fn aggregate_type(&self) -> &'static str {
        "order"
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
    use crate::model::{MenuItem, RestaurantMenu};
    use readflow_core::projection::ProjectionError;
    use readflow_testing::store::InMemoryProjectionStore;

    fn envelope(id: &str, seq: u64, event: &OrderEvent) -> EventEnvelope {
        EventEnvelope::from_event(AggregateId::new(id), SequenceNumber::new(seq), event)
            .expect("envelope should serialize")
    }

    fn line_items() -> Vec<OrderLineItem> {
        vec![OrderLineItem {
            menu_item_id: "item-1".to_string(),
            name: "Margherita".to_string(),
            price_cents: 1_050,
            quantity: 2,
        }]
    }

    struct Fixture {
        orders: OrderProjection,
        customers: ReadModel<CustomerEntity>,
        restaurants: ReadModel<RestaurantEntity>,
    }

    fn fixture() -> Fixture {
        let customers: ReadModel<CustomerEntity> =
            ReadModel::new(Arc::new(InMemoryProjectionStore::new()));
        let restaurants: ReadModel<RestaurantEntity> =
            ReadModel::new(Arc::new(InMemoryProjectionStore::new()));
        let orders = OrderProjection::new(
            Arc::new(InMemoryProjectionStore::new()),
            customers.clone(),
            restaurants.clone(),
        );
        Fixture {
            orders,
            customers,
            restaurants,
        }
    }

    async fn seed_customer(fixture: &Fixture, id: &str) {
        let entity = CustomerEntity {
            id: AggregateId::new(id),
            aggregate_version: SequenceNumber::INITIAL,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            order_limit_cents: 10_000,
        };
        fixture
            .customers
            .save(&entity, DispatchMode::Live)
            .await
            .expect("seed customer");
    }

    async fn seed_restaurant(fixture: &Fixture, id: &str) {
        let entity = RestaurantEntity {
            id: AggregateId::new(id),
            aggregate_version: SequenceNumber::INITIAL,
            name: "Trattoria".to_string(),
            menu: RestaurantMenu {
                items: vec![MenuItem {
                    id: "item-1".to_string(),
                    name: "Margherita".to_string(),
                    price_cents: 1_050,
                }],
                version: "v1".to_string(),
            },
        };
        fixture
            .restaurants
            .save(&entity, DispatchMode::Live)
            .await
            .expect("seed restaurant");
    }

    #[tokio::test]
    async fn lifecycle_advances_state_and_version() {
        let fixture = fixture();
        seed_customer(&fixture, "customer-1").await;
        seed_restaurant(&fixture, "restaurant-1").await;
        let orders = &fixture.orders;

        let events = [
            OrderEvent::CreationInitiated {
                line_items: line_items(),
            },
            OrderEvent::VerifiedByCustomer {
                customer_id: AggregateId::new("customer-1"),
            },
            OrderEvent::VerifiedByRestaurant {
                restaurant_id: AggregateId::new("restaurant-1"),
            },
            OrderEvent::Prepared,
            OrderEvent::ReadyForDelivery,
            OrderEvent::Delivered,
        ];
        for (i, event) in events.iter().enumerate() {
            let seq = u64::try_from(i).expect("small index") + 1;
            orders
                .apply(&envelope("order-1", seq, event), DispatchMode::Live)
                .await
                .expect("apply should succeed");
        }

        let entity = orders
            .order(&AggregateId::new("order-1"))
            .await
            .expect("order should exist");
        assert_eq!(entity.state, OrderState::Delivered);
        assert_eq!(entity.aggregate_version, SequenceNumber::new(6));
        assert_eq!(
            entity.customer.expect("customer embedded").id,
            AggregateId::new("customer-1")
        );
        assert_eq!(
            entity.restaurant.expect("restaurant embedded").id,
            AggregateId::new("restaurant-1")
        );
    }

    #[tokio::test]
    async fn update_for_unknown_order_is_missing_prior_state() {
        let fixture = fixture();
        let result = fixture
            .orders
            .apply(
                &envelope("order-9", 2, &OrderEvent::Prepared),
                DispatchMode::Live,
            )
            .await;

        assert!(matches!(
            result,
            Err(ProjectionError::MissingPriorState { ref id }) if id.as_str() == "order-9"
        ));
        assert!(
            fixture
                .orders
                .orders()
                .await
                .expect("query should succeed")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn verification_join_requires_the_customer() {
        let fixture = fixture();
        fixture
            .orders
            .apply(
                &envelope(
                    "order-1",
                    1,
                    &OrderEvent::CreationInitiated {
                        line_items: line_items(),
                    },
                ),
                DispatchMode::Live,
            )
            .await
            .expect("creation should succeed");

        let result = fixture
            .orders
            .apply(
                &envelope(
                    "order-1",
                    2,
                    &OrderEvent::VerifiedByCustomer {
                        customer_id: AggregateId::new("customer-ghost"),
                    },
                ),
                DispatchMode::Live,
            )
            .await;
        assert!(matches!(
            result,
            Err(ProjectionError::MissingPriorState { ref id }) if id.as_str() == "customer-ghost"
        ));

        // The order is unchanged by the failed join.
        let entity = fixture
            .orders
            .order(&AggregateId::new("order-1"))
            .await
            .expect("order should exist");
        assert_eq!(entity.state, OrderState::CreatePending);
        assert_eq!(entity.aggregate_version, SequenceNumber::new(1));
    }

    #[tokio::test]
    async fn rejected_is_terminal_state_write() {
        let fixture = fixture();
        fixture
            .orders
            .apply(
                &envelope(
                    "order-1",
                    1,
                    &OrderEvent::CreationInitiated {
                        line_items: line_items(),
                    },
                ),
                DispatchMode::Live,
            )
            .await
            .expect("creation should succeed");
        fixture
            .orders
            .apply(
                &envelope("order-1", 2, &OrderEvent::Rejected),
                DispatchMode::Live,
            )
            .await
            .expect("rejection should succeed");

        let entity = fixture
            .orders
            .order(&AggregateId::new("order-1"))
            .await
            .expect("order should exist");
        assert_eq!(entity.state, OrderState::Rejected);
    }

    #[tokio::test]
    async fn watcher_created_before_update_receives_exactly_one_push() {
        let fixture = fixture();
        seed_customer(&fixture, "customer-1").await;
        fixture
            .orders
            .apply(
                &envelope(
                    "order-1",
                    1,
                    &OrderEvent::CreationInitiated {
                        line_items: line_items(),
                    },
                ),
                DispatchMode::Live,
            )
            .await
            .expect("creation should succeed");

        let (initial, mut sub) = fixture
            .orders
            .watch_order(AggregateId::new("order-1"))
            .await
            .expect("watch should succeed");
        assert_eq!(
            initial.expect("snapshot present").aggregate_version,
            SequenceNumber::new(1)
        );

        fixture
            .orders
            .apply(
                &envelope(
                    "order-1",
                    2,
                    &OrderEvent::VerifiedByCustomer {
                        customer_id: AggregateId::new("customer-1"),
                    },
                ),
                DispatchMode::Live,
            )
            .await
            .expect("verification should succeed");

        let pushed = sub.next().await.expect("exactly one update");
        assert_eq!(pushed.aggregate_version, SequenceNumber::new(2));
        assert_eq!(pushed.state, OrderState::VerifiedByCustomer);
        assert!(sub.try_next().is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 32,
                ..ProptestConfig::default()
            })]

            /// Redelivering each event any number of times converges to the
            /// same entity as a single clean pass.
            #[test]
            fn redelivery_counts_do_not_change_the_outcome(
                redeliveries in prop::collection::vec(1_usize..4, 3)
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .expect("runtime should build");
                runtime.block_on(async {
                    let fixture = fixture();
                    seed_customer(&fixture, "customer-1").await;

                    let events = [
                        OrderEvent::CreationInitiated { line_items: line_items() },
                        OrderEvent::VerifiedByCustomer {
                            customer_id: AggregateId::new("customer-1"),
                        },
                        OrderEvent::Prepared,
                    ];
                    for (i, (event, count)) in events.iter().zip(&redeliveries).enumerate() {
                        let seq = u64::try_from(i).expect("small index") + 1;
                        for _ in 0..*count {
                            fixture
                                .orders
                                .apply(&envelope("order-1", seq, event), DispatchMode::Live)
                                .await
                                .expect("apply should succeed");
                        }
                    }

                    let entity = fixture
                        .orders
                        .order(&AggregateId::new("order-1"))
                        .await
                        .expect("order should exist");
                    assert_eq!(entity.aggregate_version, SequenceNumber::new(3));
                    assert_eq!(entity.state, OrderState::Prepared);
                });
            }
        }
    }
}
