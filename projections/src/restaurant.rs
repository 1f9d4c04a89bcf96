//! Restaurant read model (processing group `"restaurant"`).

use crate::handler::{already_applied, decode};
use crate::model::RestaurantMenu;
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
pub const GROUP: &str = "restaurant";

/// Event types consumed by this group.
pub const EVENT_TYPES: &[&str] = &["RestaurantCreated.v1"];

/// Events of the restaurant aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RestaurantEvent {
    /// A restaurant was registered with its initial menu.
    Created {
        /// Restaurant display name.
        name: String,
        /// The menu offered at creation time.
        menu: RestaurantMenu,
    },
}

impl Event for RestaurantEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "RestaurantCreated.v1",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "restaurant"
    }
}

/// A restaurant row in the read model, menu embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantEntity {
    /// Restaurant aggregate id.
    pub id: AggregateId,
    /// Sequence number of the last applied event.
    pub aggregate_version: SequenceNumber,
    /// Display name.
    pub name: String,
    /// Embedded menu snapshot.
    pub menu: RestaurantMenu,
}

impl Entity for RestaurantEntity {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn aggregate_version(&self) -> SequenceNumber {
        self.aggregate_version
    }
}

/// Projects restaurant events and answers restaurant queries.
pub struct RestaurantProjection {
    model: ReadModel<RestaurantEntity>,
}

impl RestaurantProjection {
    /// Create the projection over the group's store.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            model: ReadModel::new(store),
        }
    }

    /// A handle to the underlying read model, for cross-group joins.
    #[must_use]
    pub fn model(&self) -> ReadModel<RestaurantEntity> {
        self.model.clone()
    }

    /// Point query by restaurant id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](readflow_core::projection::ProjectionError::NotFound)
    /// for an unknown id.
    pub async fn restaurant(&self, id: &AggregateId) -> Result<RestaurantEntity> {
        self.model.find(id).await
    }

    /// All restaurants.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the read fails.
    pub async fn restaurants(&self) -> Result<Vec<RestaurantEntity>> {
        self.model.find_all().await
    }

    /// Live query for one restaurant.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_restaurant(
        &self,
        id: AggregateId,
    ) -> Result<(Option<RestaurantEntity>, Subscription<RestaurantEntity>)> {
        self.model.watch(id).await
    }

    /// Live query for the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_restaurants(
        &self,
    ) -> Result<(Vec<RestaurantEntity>, Subscription<RestaurantEntity>)> {
        self.model.watch_all().await
    }

    async fn apply_event(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        if already_applied(&self.model, envelope, mode).await? {
            return Ok(());
        }

        let RestaurantEvent::Created { name, menu } = decode(envelope)?;

        let entity = RestaurantEntity {
            id: envelope.aggregate_id.clone(),
            aggregate_version: envelope.sequence_number,
            name,
            menu,
        };
        self.model.save(&entity, mode).await
    }
}

impl ProjectionHandler for RestaurantProjection {
    fn aggregate_type(&self) -> &'static str {
        "restaurant"
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
    use crate::model::MenuItem;

    use readflow_testing::store::InMemoryProjectionStore;

    fn sample_menu() -> RestaurantMenu {
        RestaurantMenu {
            items: vec![MenuItem {
                id: "item-1".to_string(),
                name: "Margherita".to_string(),
                price_cents: 1_050,
            }],
            version: "v1".to_string(),
        }
    }

    fn created(id: &str, seq: u64) -> EventEnvelope {
        EventEnvelope::from_event(
            AggregateId::new(id),
            SequenceNumber::new(seq),
            &RestaurantEvent::Created {
                name: "Trattoria".to_string(),
                menu: sample_menu(),
            },
        )
        .expect("envelope should serialize")
    }

    #[tokio::test]
    async fn creation_event_embeds_the_menu() {
        let projection = RestaurantProjection::new(Arc::new(InMemoryProjectionStore::new()));

        projection
            .apply(&created("restaurant-1", 1), DispatchMode::Live)
            .await
            .expect("apply should succeed");

        let entity = projection
            .restaurant(&AggregateId::new("restaurant-1"))
            .await
            .expect("restaurant should exist");
        assert_eq!(entity.name, "Trattoria");
        assert_eq!(entity.menu.items.len(), 1);
        assert_eq!(entity.menu.version, "v1");
    }

    #[tokio::test]
    async fn replay_apply_writes_without_publishing() {
        let projection = RestaurantProjection::new(Arc::new(InMemoryProjectionStore::new()));
        let (_, mut sub) = projection
            .watch_restaurants()
            .await
            .expect("watch should succeed");

        projection
            .apply(&created("restaurant-1", 1), DispatchMode::Replay)
            .await
            .expect("apply should succeed");

        assert!(sub.try_next().is_none());
        assert_eq!(
            projection
                .restaurants()
                .await
                .expect("query should succeed")
                .len(),
            1
        );
    }
}
