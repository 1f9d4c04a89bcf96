//! Live ingestion pipeline: event source → coordinator → one group.
//!
//! One pipeline per processing group subscribes to the aggregate types the
//! group's handlers claim and feeds every envelope to the coordinator.
//! Processing failures never crash the pipeline: unroutable or failing
//! events are logged and the stream continues, and `GroupBusy` rejections
//! rely on the source's at-least-once redelivery.

use crate::coordinator::ReplayCoordinator;
use futures::StreamExt;
use readflow_core::projection::{ProjectionError, Result};
use readflow_core::source::EventSource;
use std::sync::Arc;
use tokio::sync::watch;

/// Drives one processing group from a live event stream.
///
/// # Example
///
/// ```ignore
/// let (mut pipeline, shutdown) = EventPipeline::new(source, coordinator, "order");
///
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     shutdown.send(true).ok();
/// });
///
/// pipeline.run().await?;
/// ```
pub struct EventPipeline {
    source: Arc<dyn EventSource>,
    coordinator: Arc<ReplayCoordinator>,
    group: String,
    shutdown: watch::Receiver<bool>,
}

impl EventPipeline {
    /// Create a pipeline for one group.
    ///
    /// Returns the pipeline and a shutdown sender; send `true` to stop the
    /// run loop gracefully.
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        coordinator: Arc<ReplayCoordinator>,
        group: impl Into<String>,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pipeline = Self {
            source,
            coordinator,
            group: group.into(),
            shutdown: shutdown_rx,
        };
        (pipeline, shutdown_tx)
    }

    /// Subscribe and process events until shutdown or end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownGroup`] if the group is not
    /// registered, or [`ProjectionError::Source`] if the subscription
    /// cannot be established. Per-event failures are logged, not returned.
    #[allow(clippy::cognitive_complexity)]
    pub async fn run(&mut self) -> Result<()> {
        let group = self.group.clone();
        let coordinator = Arc::clone(&self.coordinator);
        let aggregate_types = coordinator.aggregate_types(&group)?;

        tracing::info!(
            group = %group,
            aggregate_types = ?aggregate_types,
            "Starting event pipeline"
        );

        let mut stream = self
            .source
            .subscribe(&aggregate_types)
            .await
            .map_err(|e| ProjectionError::Source(e.to_string()))?;

        while !*self.shutdown.borrow() {
            tokio::select! {
                maybe_event = stream.next() => {
                    match maybe_event {
                        Some(Ok(envelope)) => {
                            match coordinator.ingest(&group, &envelope).await {
                                Ok(()) => {}
                                Err(ProjectionError::GroupBusy { status, .. }) => {
                                    // The source redelivers once the group is idle.
                                    tracing::warn!(
                                        group = %group,
                                        status = %status,
                                        event_type = %envelope.event_type,
                                        "Group busy, awaiting redelivery"
                                    );
                                }
                                Err(e) => {
                                    tracing::error!(
                                        group = %group,
                                        error = ?e,
                                        event_type = %envelope.event_type,
                                        aggregate_id = %envelope.aggregate_id,
                                        "Failed to process event"
                                    );
                                }
                            }
                        }
                        Some(Err(e)) => {
                            // Stream error; the source handles reconnection.
                            tracing::error!(group = %group, error = ?e, "Error receiving event");
                        }
                        None => {
                            tracing::info!(group = %group, "Event stream ended");
                            break;
                        }
                    }
                }

                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        tracing::info!(group = %group, "Shutdown signal received");
                        break;
                    }
                }
            }
        }

        tracing::info!(group = %group, "Event pipeline stopped");
        Ok(())
    }
}
