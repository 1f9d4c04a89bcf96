//! End-to-end tests over the assembled read side: live ingestion,
//! broadcasting, resets, and full-log replays across processing groups.

#![allow(clippy::expect_used)] // Panics: Test will fail if read-side operations fail

use readflow_core::aggregate::{AggregateId, SequenceNumber};
use readflow_core::event::{Event, EventEnvelope};
use readflow_core::projection::{GroupStatus, ProjectionError};
use readflow_core::sink::NotificationSink;
use readflow_projections::model::{MenuItem, OrderLineItem, RestaurantMenu};
use readflow_projections::read_side::{self, ReadSide};
use readflow_projections::{
    courier, customer, order, restaurant, CourierEvent, CustomerEvent, OrderEvent, OrderState,
    RestaurantEvent,
};
use readflow_testing::event_log::InMemoryEventLog;
use readflow_testing::sink::RecordingNotificationSink;
use readflow_testing::store::InMemoryProjectionStore;
use std::sync::Arc;

fn envelope<E: Event + serde::Serialize>(id: &str, seq: u64, event: &E) -> EventEnvelope {
    EventEnvelope::from_event(AggregateId::new(id), SequenceNumber::new(seq), event)
        .expect("envelope should serialize")
}

fn menu() -> RestaurantMenu {
    RestaurantMenu {
        items: vec![MenuItem {
            id: "item-1".to_string(),
            name: "Margherita".to_string(),
            price_cents: 1_050,
        }],
        version: "v1".to_string(),
    }
}

fn order_items() -> Vec<OrderLineItem> {
    vec![OrderLineItem {
        menu_item_id: "item-1".to_string(),
        name: "Margherita".to_string(),
        price_cents: 1_050,
        quantity: 2,
    }]
}

fn order_lifecycle() -> Vec<OrderEvent> {
    vec![
        OrderEvent::CreationInitiated {
            line_items: order_items(),
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
    ]
}

struct Fixture {
    read_side: ReadSide,
    log: InMemoryEventLog,
    sink: Arc<RecordingNotificationSink>,
}

impl Fixture {
    fn new() -> Self {
        let sink = Arc::new(RecordingNotificationSink::new());
        let read_side = ReadSide::new(
            |_| Arc::new(InMemoryProjectionStore::new()),
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
        );
        Self {
            read_side,
            log: InMemoryEventLog::new(),
            sink,
        }
    }

    /// Append to the log and apply live, the way a pipeline would.
    async fn feed(&self, group: &str, envelope: EventEnvelope) {
        self.log.append(envelope.clone());
        self.read_side
            .ingest(group, &envelope)
            .await
            .expect("live ingestion should succeed");
    }

    /// Seed the customer and restaurant the order lifecycle joins against.
    async fn seed_references(&self) {
        self.feed(
            customer::GROUP,
            envelope(
                "customer-1",
                1,
                &CustomerEvent::Created {
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    order_limit_cents: 100_000,
                },
            ),
        )
        .await;
        self.feed(
            restaurant::GROUP,
            envelope(
                "restaurant-1",
                1,
                &RestaurantEvent::Created {
                    name: "Trattoria".to_string(),
                    menu: menu(),
                },
            ),
        )
        .await;
    }

    async fn feed_order_lifecycle(&self) {
        for (offset, event) in order_lifecycle().into_iter().enumerate() {
            let seq = u64::try_from(offset).expect("small index") + 1;
            self.feed(order::GROUP, envelope("order-1", seq, &event))
                .await;
        }
    }
}

#[tokio::test]
async fn order_lifecycle_converges_to_the_event_count() {
    let fixture = Fixture::new();
    fixture.seed_references().await;
    fixture.feed_order_lifecycle().await;

    let entity = fixture
        .read_side
        .orders()
        .order(&AggregateId::new("order-1"))
        .await
        .expect("order should exist");

    assert_eq!(entity.aggregate_version, SequenceNumber::new(6));
    assert_eq!(entity.state, OrderState::Delivered);
    assert_eq!(
        entity.customer.expect("customer embedded").first_name,
        "Ada"
    );
    assert_eq!(
        entity.restaurant.expect("restaurant embedded").name,
        "Trattoria"
    );
}

#[tokio::test]
async fn rebuild_reproduces_the_live_state() {
    let fixture = Fixture::new();
    fixture.seed_references().await;
    fixture.feed_order_lifecycle().await;

    let before = fixture
        .read_side
        .orders()
        .orders()
        .await
        .expect("query should succeed");

    fixture
        .read_side
        .rebuild(order::GROUP, &fixture.log)
        .await
        .expect("rebuild should succeed");

    let after = fixture
        .read_side
        .orders()
        .orders()
        .await
        .expect("query should succeed");
    assert_eq!(after, before);
    assert_eq!(
        fixture
            .read_side
            .status(order::GROUP)
            .expect("group is registered"),
        GroupStatus::Idle
    );
}

#[tokio::test]
async fn broadcasts_fire_once_per_event_and_never_during_replay() {
    let fixture = Fixture::new();
    fixture.seed_references().await;
    fixture.feed_order_lifecycle().await;

    let order_updates = |sink: &RecordingNotificationSink| {
        sink.deliveries()
            .into_iter()
            .filter(|(topic, _)| topic == read_side::ORDERS_TOPIC)
            .count()
    };

    assert_eq!(order_updates(&fixture.sink), 6);
    // The customer group has no broadcaster; only the seeded restaurant
    // creation reached a topic besides the order updates.
    assert_eq!(fixture.sink.len(), 7);

    fixture
        .read_side
        .rebuild(order::GROUP, &fixture.log)
        .await
        .expect("rebuild should succeed");

    assert_eq!(order_updates(&fixture.sink), 6);
    assert_eq!(fixture.sink.len(), 7);
}

#[tokio::test]
async fn watchers_see_exactly_one_push_per_event() {
    let fixture = Fixture::new();
    fixture.seed_references().await;
    fixture
        .feed(
            order::GROUP,
            envelope(
                "order-1",
                1,
                &OrderEvent::CreationInitiated {
                    line_items: order_items(),
                },
            ),
        )
        .await;

    let (snapshot, mut sub) = fixture
        .read_side
        .orders()
        .watch_order(AggregateId::new("order-1"))
        .await
        .expect("watch should succeed");
    assert_eq!(
        snapshot.expect("order exists").state,
        OrderState::CreatePending
    );

    fixture
        .feed(
            order::GROUP,
            envelope(
                "order-1",
                2,
                &OrderEvent::VerifiedByCustomer {
                    customer_id: AggregateId::new("customer-1"),
                },
            ),
        )
        .await;

    let pushed = sub.next().await.expect("update should arrive");
    assert_eq!(pushed.aggregate_version, SequenceNumber::new(2));
    assert_eq!(pushed.state, OrderState::VerifiedByCustomer);
    assert!(sub.try_next().is_none());
}

#[tokio::test]
async fn updates_for_unknown_orders_are_rejected() {
    let fixture = Fixture::new();
    fixture.seed_references().await;

    let result = fixture
        .read_side
        .ingest(
            order::GROUP,
            &envelope("order-ghost", 2, &OrderEvent::Prepared),
        )
        .await;

    assert!(matches!(
        result,
        Err(ProjectionError::MissingPriorState { ref id }) if id.as_str() == "order-ghost"
    ));
}

#[tokio::test]
async fn reset_blocks_live_ingestion_until_replay_completes() {
    let fixture = Fixture::new();
    fixture.seed_references().await;
    fixture.feed_order_lifecycle().await;

    fixture
        .read_side
        .trigger_reset(order::GROUP)
        .await
        .expect("reset should succeed");
    assert_eq!(
        fixture
            .read_side
            .status(order::GROUP)
            .expect("group is registered"),
        GroupStatus::Resetting
    );

    let rejected = fixture
        .read_side
        .ingest(
            order::GROUP,
            &envelope("order-2", 1, &OrderEvent::CreationInitiated {
                line_items: order_items(),
            }),
        )
        .await;
    assert!(matches!(rejected, Err(ProjectionError::GroupBusy { .. })));

    fixture
        .read_side
        .replay(order::GROUP, &fixture.log)
        .await
        .expect("replay should succeed");

    let entity = fixture
        .read_side
        .orders()
        .order(&AggregateId::new("order-1"))
        .await
        .expect("order should be rebuilt");
    assert_eq!(entity.aggregate_version, SequenceNumber::new(6));
}

#[tokio::test]
async fn resetting_one_group_leaves_the_others_untouched() {
    let fixture = Fixture::new();
    fixture.seed_references().await;
    fixture
        .feed(
            courier::GROUP,
            envelope(
                "courier-1",
                1,
                &CourierEvent::Created {
                    first_name: "Grace".to_string(),
                    last_name: "Hopper".to_string(),
                    max_active_orders: 5,
                },
            ),
        )
        .await;
    fixture.feed_order_lifecycle().await;

    fixture
        .read_side
        .trigger_reset(order::GROUP)
        .await
        .expect("reset should succeed");

    assert!(
        fixture
            .read_side
            .orders()
            .orders()
            .await
            .expect("query should succeed")
            .is_empty()
    );
    assert_eq!(
        fixture
            .read_side
            .restaurants()
            .restaurants()
            .await
            .expect("query should succeed")
            .len(),
        1
    );
    assert_eq!(
        fixture
            .read_side
            .couriers()
            .couriers()
            .await
            .expect("query should succeed")
            .len(),
        1
    );
    assert_eq!(
        fixture
            .read_side
            .status(courier::GROUP)
            .expect("group is registered"),
        GroupStatus::Idle
    );
}
