//! # Readflow Engine
//!
//! The projection engine: routing, subscription queries, processing
//! groups, replay coordination, and the live ingestion pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────────┐
//! │ EventSource  │────▶│ EventPipeline │────▶│ReplayCoordinator │
//! └──────────────┘     └───────────────┘     └────────┬─────────┘
//!                                                     │ per group
//!                                                     ▼
//!                      ┌───────────────┐     ┌──────────────────┐
//!                      │  EventRouter  │◀────│ ProcessingGroup  │
//!                      └───────┬───────┘     └──────────────────┘
//!                              │ fan-out
//!                              ▼
//!                      ┌───────────────┐     ┌──────────────────┐
//!                      │ProjectionHandler│──▶│  ReadModel<E>    │──▶ subscribers
//!                      └───────────────┘     └──────────────────┘
//! ```
//!
//! Handlers live in downstream crates; this crate is generic over the
//! entity and event types they define.

pub mod coordinator;
pub mod group;
pub mod pipeline;
pub mod read_model;
pub mod router;
pub mod subscription;

pub use coordinator::ReplayCoordinator;
pub use group::ProcessingGroup;
pub use pipeline::EventPipeline;
pub use read_model::ReadModel;
pub use router::{DispatchMode, EventRouter, ProjectionHandler};
pub use subscription::{
    DEFAULT_SUBSCRIPTION_CAPACITY, Subscription, SubscriptionId, SubscriptionRegistry,
};
