//! Customer read model (processing group `"customer"`).

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
pub const GROUP: &str = "customer";

/// Event types consumed by this group.
pub const EVENT_TYPES: &[&str] = &["CustomerCreated.v1"];

/// Events of the customer aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CustomerEvent {
    /// A customer account was created.
    Created {
        /// Customer's first name.
        first_name: String,
        /// Customer's last name.
        last_name: String,
        /// Maximum total order amount, in cents.
        order_limit_cents: u64,
    },
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "CustomerCreated.v1",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "customer"
    }
}

/// A customer row in the read model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerEntity {
    /// Customer aggregate id.
    pub id: AggregateId,
    /// Sequence number of the last applied event.
    pub aggregate_version: SequenceNumber,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Maximum total order amount, in cents.
    pub order_limit_cents: u64,
}

impl Entity for CustomerEntity {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn aggregate_version(&self) -> SequenceNumber {
        self.aggregate_version
    }
}

/// Projects customer events and answers customer queries.
pub struct CustomerProjection {
    model: ReadModel<CustomerEntity>,
}

impl CustomerProjection {
    /// Create the projection over the group's store.
    #[must_use]
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            model: ReadModel::new(store),
        }
    }

    /// A handle to the underlying read model, for cross-group joins.
    #[must_use]
    pub fn model(&self) -> ReadModel<CustomerEntity> {
        self.model.clone()
    }

    /// Point query by customer id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](readflow_core::projection::ProjectionError::NotFound)
    /// for an unknown id.
    pub async fn customer(&self, id: &AggregateId) -> Result<CustomerEntity> {
        self.model.find(id).await
    }

    /// All customers. Empty store yields an empty collection.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error if the read fails.
    pub async fn customers(&self) -> Result<Vec<CustomerEntity>> {
        self.model.find_all().await
    }

    /// Live query for one customer: current state plus every update.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_customer(
        &self,
        id: AggregateId,
    ) -> Result<(Option<CustomerEntity>, Subscription<CustomerEntity>)> {
        self.model.watch(id).await
    }

    /// Live query for the whole collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot read fails.
    pub async fn watch_customers(
        &self,
    ) -> Result<(Vec<CustomerEntity>, Subscription<CustomerEntity>)> {
        self.model.watch_all().await
    }

    async fn apply_event(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        if already_applied(&self.model, envelope, mode).await? {
            return Ok(());
        }

        let CustomerEvent::Created {
            first_name,
            last_name,
            order_limit_cents,
        } = decode(envelope)?;

        let entity = CustomerEntity {
            id: envelope.aggregate_id.clone(),
            aggregate_version: envelope.sequence_number,
            first_name,
            last_name,
            order_limit_cents,
        };
        self.model.save(&entity, mode).await
    }
}

impl ProjectionHandler for CustomerProjection {
    fn aggregate_type(&self) -> &'static str {
        "customer"
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
