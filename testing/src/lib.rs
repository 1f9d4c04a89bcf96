//! # Readflow Testing
//!
//! In-memory test doubles for the readflow projection engine:
//!
//! - [`store::InMemoryProjectionStore`]: `BTreeMap`-backed projection
//!   store with failure injection
//! - [`event_log::InMemoryEventLog`]: event log that serves both live
//!   subscriptions and replay reads
//! - [`sink::RecordingNotificationSink`]: notification sink that records
//!   deliveries for assertions
//!
//! Everything here is deterministic and allocation-only, so projection
//! tests run without external infrastructure.

pub mod event_log;
pub mod sink;
pub mod store;

pub use event_log::InMemoryEventLog;
pub use sink::RecordingNotificationSink;
pub use store::InMemoryProjectionStore;
