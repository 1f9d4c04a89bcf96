//! In-memory projection store for fast, deterministic tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use readflow_core::projection::{ProjectionError, ProjectionStore, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory [`ProjectionStore`] backed by a `BTreeMap`.
///
/// `find_all` returns rows in key order, which keeps assertions on
/// collection queries deterministic. Failure injection knobs cover the
/// error paths that a real backend would exercise.
///
/// # Example
///
/// ```
/// use readflow_testing::store::InMemoryProjectionStore;
/// use readflow_core::projection::ProjectionStore;
///
/// # async fn example() -> readflow_core::projection::Result<()> {
/// let store = InMemoryProjectionStore::new();
/// store.upsert("customer-1", b"bytes").await?;
/// assert!(store.find_by_id("customer-1").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryProjectionStore {
    rows: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    fail_next_delete_all: Arc<AtomicBool>,
}

impl InMemoryProjectionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Whether the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().unwrap().is_empty()
    }

    /// Whether a row exists under `id`.
    #[must_use]
    pub fn contains_key(&self, id: &str) -> bool {
        self.rows.read().unwrap().contains_key(id)
    }

    /// All stored ids, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.rows.read().unwrap().keys().cloned().collect()
    }

    /// Seed a raw row, bypassing the trait (and any injected failures).
    pub fn insert_raw(&self, id: &str, bytes: Vec<u8>) {
        self.rows.write().unwrap().insert(id.to_string(), bytes);
    }

    /// Make every subsequent `upsert` fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `delete_all` fail with a storage error.
    ///
    /// The flag clears after one failure, so a retried reset succeeds.
    pub fn fail_next_delete_all(&self) {
        self.fail_next_delete_all.store(true, Ordering::SeqCst);
    }
}

impl ProjectionStore for InMemoryProjectionStore {
    fn upsert(
        &self,
        id: &str,
        data: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let id = id.to_string();
        let data = data.to_vec();
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ProjectionError::Storage(
                    "injected write failure".to_string(),
                ));
            }
            self.rows.write().unwrap().insert(id, data);
            Ok(())
        })
    }

    fn find_by_id(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.rows.read().unwrap().get(&id).cloned()) })
    }

    fn find_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<(String, Vec<u8>)>>> + Send + '_>> {
        Box::pin(async move {
            Ok(self
                .rows
                .read()
                .unwrap()
                .iter()
                .map(|(id, bytes)| (id.clone(), bytes.clone()))
                .collect())
        })
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_next_delete_all.swap(false, Ordering::SeqCst) {
                return Err(ProjectionError::Storage(
                    "injected delete failure".to_string(),
                ));
            }
            self.rows.write().unwrap().clear();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = InMemoryProjectionStore::new();
        store.upsert("a", b"one").await.unwrap();
        store.upsert("a", b"two").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_id("a").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn find_by_id_distinguishes_absence() {
        let store = InMemoryProjectionStore::new();
        assert_eq!(store.find_by_id("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_all_is_key_ordered() {
        let store = InMemoryProjectionStore::new();
        store.upsert("b", b"2").await.unwrap();
        store.upsert("a", b"1").await.unwrap();

        let ids: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn delete_all_clears_the_store() {
        let store = InMemoryProjectionStore::new();
        store.upsert("a", b"1").await.unwrap();
        store.delete_all().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn injected_delete_failure_fires_once() {
        let store = InMemoryProjectionStore::new();
        store.insert_raw("a", vec![1]);
        store.fail_next_delete_all();

        assert!(store.delete_all().await.is_err());
        assert!(!store.is_empty());

        store.delete_all().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn injected_write_failure() {
        let store = InMemoryProjectionStore::new();
        store.fail_writes(true);
        assert!(store.upsert("a", b"1").await.is_err());

        store.fail_writes(false);
        assert!(store.upsert("a", b"1").await.is_ok());
    }
}
