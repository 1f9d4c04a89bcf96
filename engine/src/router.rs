//! Event routing: fan-out of envelopes to the handlers of one group.
//!
//! # Overview
//!
//! A processing group owns an [`EventRouter`] holding its handlers in
//! registration order. On each envelope the router invokes every handler
//! registered for the envelope's event type, sequentially:
//!
//! ```text
//! ┌──────────────┐
//! │EventEnvelope │
//! └──────┬───────┘
//!        │ dispatch(mode)
//!        ▼
//! ┌──────────────┐   event_types() match
//! │ EventRouter  │──────────────────────┐
//! └──────────────┘                      ▼
//!                          ┌─────────────────────┐
//!                          │ ProjectionHandler(s)│ (in registration order)
//!                          └─────────────────────┘
//! ```
//!
//! Multiple handlers may claim the same event type (a store-updating
//! handler plus a broadcast handler, for example). Zero claims is an
//! [`UnroutableEvent`](ProjectionError::UnroutableEvent): logged, and the
//! event is dropped for this group.
//!
//! # Replay
//!
//! During a replay the router skips handlers that declare themselves
//! replay-ineligible for the event type. This is how non-repeatable side
//! effects (outbound notifications) stay out of rebuilds while the pure
//! read-model writes are re-applied.

use readflow_core::event::EventEnvelope;
use readflow_core::projection::{ProjectionError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Whether an envelope is live traffic or part of a replay.
///
/// Handlers receive the mode with every event so they can suppress
/// subscription pushes during rebuilds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Normal operation: the event just happened.
    Live,
    /// Historical re-application during a rebuild.
    Replay,
}

/// A projection event handler.
///
/// Implementations apply events to one read model (or broadcast them to an
/// outbound sink). Handlers declare up front which aggregate type they
/// belong to and which event types they consume; the router uses those
/// declarations for fan-out and the coordinator uses them to know which
/// logs to stream during a replay.
///
/// # Dyn Compatibility
///
/// Uses an explicit `Pin<Box<dyn Future>>` return to enable trait object
/// usage (`Arc<dyn ProjectionHandler>`).
pub trait ProjectionHandler: Send + Sync {
    /// The aggregate type whose event log feeds this handler.
    fn aggregate_type(&self) -> &'static str;

    /// The event types this handler consumes.
    fn event_types(&self) -> &'static [&'static str];

    /// Whether this handler participates in replays of `event_type`.
    ///
    /// Defaults to `true`. Handlers with non-repeatable side effects
    /// return `false` and are skipped entirely in replay mode.
    fn replay_eligible(&self, event_type: &str) -> bool {
        let _ = event_type;
        true
    }

    /// Apply one event envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if decoding, a required prior-state
    /// lookup, or the store write fails. The store must be unchanged when
    /// an error is returned.
    fn apply<'a>(
        &'a self,
        envelope: &'a EventEnvelope,
        mode: DispatchMode,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Routes envelopes to the handlers of one processing group.
///
/// Handlers run sequentially in registration order, so a store-updating
/// handler registered before a broadcast handler is guaranteed to have
/// written before the broadcast fires.
pub struct EventRouter {
    group: String,
    handlers: Vec<Arc<dyn ProjectionHandler>>,
}

impl EventRouter {
    /// Create an empty router for the named group.
    #[must_use]
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            handlers: Vec::new(),
        }
    }

    /// Register a handler. Registration order is dispatch order.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn ProjectionHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// The processing group this router belongs to.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The distinct aggregate types claimed by the registered handlers,
    /// in first-registration order.
    #[must_use]
    pub fn aggregate_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        for handler in &self.handlers {
            let aggregate_type = handler.aggregate_type();
            if !types.contains(&aggregate_type) {
                types.push(aggregate_type);
            }
        }
        types
    }

    /// Dispatch an envelope to every handler registered for its event type.
    ///
    /// In replay mode, replay-ineligible handlers are skipped. A handler
    /// failure aborts the dispatch; handlers registered after it do not
    /// run for this envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnroutableEvent`] when no handler claims
    /// the event type, or the first handler error otherwise.
    pub async fn dispatch(&self, envelope: &EventEnvelope, mode: DispatchMode) -> Result<()> {
        let event_type = envelope.event_type.as_str();
        let mut matched = false;

        for handler in &self.handlers {
            if !handler.event_types().contains(&event_type) {
                continue;
            }
            matched = true;

            if mode == DispatchMode::Replay && !handler.replay_eligible(event_type) {
                tracing::debug!(
                    group = %self.group,
                    event_type,
                    "Skipping replay-ineligible handler"
                );
                continue;
            }

            handler.apply(envelope, mode).await?;
        }

        if matched {
            Ok(())
        } else {
            tracing::warn!(
                group = %self.group,
                event_type,
                aggregate_id = %envelope.aggregate_id,
                "No handler registered for event type"
            );
            Err(ProjectionError::UnroutableEvent {
                group: self.group.clone(),
                event_type: event_type.to_string(),
            })
        }
    }
}
