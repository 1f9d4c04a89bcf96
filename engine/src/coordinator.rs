//! Replay coordination: reset, replay, and rebuild of processing groups.
//!
//! # Overview
//!
//! The coordinator owns the registered processing groups and drives their
//! status state machine:
//!
//! ```text
//!            trigger_reset            replay (complete)
//!   Idle ───────────────▶ Resetting ───────▶ Replaying ───────▶ Idle
//!     ▲                       │                   │
//!     │                       │ delete_all fails  │ stream/handler fails
//!     │                       ▼                   ▼
//!     │                   Resetting           Replaying
//!     │                  (retry reset)       (must rebuild)
//!     └──────────────────────────────────────────┘
//! ```
//!
//! A reset clears the group's store; a replay streams the full historical
//! log for each aggregate type the group's handlers claim, through the
//! router in replay mode. Live events arriving meanwhile are rejected with
//! `GroupBusy`; the event source redelivers them once the group is idle
//! again.
//!
//! Groups are independent: resetting one never touches another's store or
//! status.

use crate::group::ProcessingGroup;
use crate::router::DispatchMode;
use futures::StreamExt;
use readflow_core::event::EventEnvelope;
use readflow_core::projection::{GroupStatus, ProjectionError, Result};
use readflow_core::source::EventLogReader;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry and lifecycle driver for processing groups.
pub struct ReplayCoordinator {
    groups: HashMap<String, Arc<ProcessingGroup>>,
}

impl Default for ReplayCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayCoordinator {
    /// Create a coordinator with no groups.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Register a processing group under its own name.
    ///
    /// Registering a second group with the same name replaces the first.
    pub fn register(&mut self, group: ProcessingGroup) {
        self.groups
            .insert(group.name().to_string(), Arc::new(group));
    }

    /// Names of all registered groups.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// The readiness state of a group.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownGroup`] for an unregistered name.
    pub fn status(&self, group: &str) -> Result<GroupStatus> {
        Ok(self.group(group)?.status())
    }

    /// The aggregate types whose logs feed a group's handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownGroup`] for an unregistered name.
    pub fn aggregate_types(&self, group: &str) -> Result<Vec<&'static str>> {
        Ok(self.group(group)?.router().aggregate_types())
    }

    /// Apply a live event to a group.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownGroup`] for an unregistered name,
    /// [`ProjectionError::GroupBusy`] while the group is resetting or
    /// replaying, or the router's error.
    pub async fn ingest(&self, group: &str, envelope: &EventEnvelope) -> Result<()> {
        self.group(group)?.ingest(envelope).await
    }

    /// Clear a group's store ahead of a replay.
    ///
    /// Accepted from any state: `Idle` (normal rebuild), `Replaying` (retry
    /// after a failed replay), and `Resetting` (retry after a failed
    /// deletion). The group's dispatch lock serializes the call against
    /// in-flight live events and replays. On success the group is left
    /// `Resetting`, awaiting [`replay`](Self::replay). If the deletion
    /// fails the group also stays `Resetting`: its store may be partially
    /// cleared and must not serve live traffic until a reset succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownGroup`] for an unregistered name
    /// or [`ProjectionError::Storage`] if the deletion fails.
    pub async fn trigger_reset(&self, name: &str) -> Result<()> {
        let group = self.group(name)?;
        let _guard = group.lock_dispatch().await;

        group.set_status(GroupStatus::Resetting);
        tracing::info!(group = name, "Resetting projection store");

        group.store().delete_all().await.inspect_err(|e| {
            tracing::error!(group = name, error = %e, "Reset failed; group stays resetting");
        })
    }

    /// Re-apply the full historical log to a freshly reset group.
    ///
    /// Streams every aggregate type the group's handlers claim, in handler
    /// registration order, dispatching each envelope in replay mode.
    /// Unroutable events in the log are logged and skipped (the log may
    /// contain event types this group never consumed). Any other failure
    /// aborts the replay and leaves the group `Replaying`: its read model
    /// is incomplete and must be rebuilt from the beginning.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownGroup`],
    /// [`ProjectionError::GroupBusy`] unless a reset completed immediately
    /// before, or [`ProjectionError::ReplayIncomplete`] if the stream or a
    /// handler fails mid-replay.
    pub async fn replay(&self, name: &str, reader: &dyn EventLogReader) -> Result<()> {
        let group = self.group(name)?;
        let _guard = group.lock_dispatch().await;

        let status = group.status();
        if status != GroupStatus::Resetting {
            return Err(ProjectionError::GroupBusy {
                group: name.to_string(),
                status,
            });
        }

        group.set_status(GroupStatus::Replaying);
        tracing::info!(group = name, "Replaying event log");

        let mut replayed: u64 = 0;
        for aggregate_type in group.router().aggregate_types() {
            let mut stream = reader.read_all(aggregate_type).await.map_err(|e| {
                ProjectionError::ReplayIncomplete {
                    group: name.to_string(),
                    reason: e.to_string(),
                }
            })?;

            while let Some(item) = stream.next().await {
                let envelope = item.map_err(|e| ProjectionError::ReplayIncomplete {
                    group: name.to_string(),
                    reason: e.to_string(),
                })?;

                match group
                    .router()
                    .dispatch(&envelope, DispatchMode::Replay)
                    .await
                {
                    Ok(()) => replayed += 1,
                    Err(ProjectionError::UnroutableEvent { event_type, .. }) => {
                        tracing::debug!(
                            group = name,
                            event_type = %event_type,
                            "Skipping unroutable event in replay"
                        );
                    }
                    Err(e) => {
                        tracing::error!(group = name, error = %e, "Replay aborted");
                        return Err(ProjectionError::ReplayIncomplete {
                            group: name.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        group.set_status(GroupStatus::Idle);
        tracing::info!(group = name, events = replayed, "Replay complete");
        Ok(())
    }

    /// Reset and replay a group in one call.
    ///
    /// This is also the retry path after a failed replay: the group is
    /// reset again and the log re-applied from the beginning.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`trigger_reset`](Self::trigger_reset) and
    /// [`replay`](Self::replay).
    pub async fn rebuild(&self, name: &str, reader: &dyn EventLogReader) -> Result<()> {
        self.trigger_reset(name).await?;
        self.replay(name, reader).await
    }

    fn group(&self, name: &str) -> Result<&Arc<ProcessingGroup>> {
        self.groups
            .get(name)
            .ok_or_else(|| ProjectionError::UnknownGroup(name.to_string()))
    }
}
