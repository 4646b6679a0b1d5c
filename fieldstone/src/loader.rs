// SPDX-License-Identifier: AGPL-3.0-or-later

//! Deferred, batchable resolution of singleton options page records.
//!
//! Many fields across one request may reference the same options page. The
//! loader buffers every requested key behind a two-phase handle and fetches
//! the whole batch in a single `RecordStore` round-trip when the
//! surrounding execution forces resolution. One loader instance lives
//! exactly as long as one request and is discarded with it.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_graphql::indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::errors::LoaderError;
use crate::store::{OptionsPageRecord, RecordStore};

/// Outcome a handle is fulfilled with: the record, a "not found" `None`, or
/// the shared error of a failed batch.
type BatchOutcome = Result<Option<OptionsPageRecord>, LoaderError>;

/// Buffering state of a loader, advanced by `load_deferred` and `dispatch`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoaderState {
    /// No key has been requested yet.
    #[default]
    Idle,

    /// At least one key is buffered and awaiting a batch fetch.
    Buffering,

    /// The last buffered batch has been fetched.
    Resolved,
}

#[derive(Default)]
struct Inner {
    state: LoaderState,

    /// One cell per requested key. Requesting a key twice hands out the
    /// same cell, so a key is never fetched twice within one request.
    cells: IndexMap<String, Arc<OnceCell<BatchOutcome>>>,

    /// Keys buffered since the last dispatch.
    pending: Vec<String>,
}

/// Placeholder for a record to be filled in by a later batched fetch.
#[derive(Clone)]
pub struct DeferredHandle {
    key: String,
    cell: Arc<OnceCell<BatchOutcome>>,
}

impl DeferredHandle {
    /// The key this handle was requested under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a dispatch has fulfilled this handle yet.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Reads the fulfilled outcome.
    ///
    /// Reading a handle no dispatch has covered is reported as an error
    /// rather than blocking; the buffering window is closed by the
    /// surrounding execution, never by the handle itself.
    pub fn value(&self) -> BatchOutcome {
        match self.cell.get() {
            Some(outcome) => outcome.clone(),
            None => Err(LoaderError::NotDispatched(self.key.clone())),
        }
    }

    /// Whether two handles share one underlying cell.
    pub fn shares_cell_with(&self, other: &DeferredHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for DeferredHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredHandle")
            .field("key", &self.key)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Request-scoped cache and batch dispatcher for options page records.
///
/// Cloning is shallow; all clones share the same buffered state, which is
/// what allows the schema manager to attach one loader to a request and
/// every resolver to reach it through the request data.
#[derive(Clone, Default)]
pub struct DeferredLoader {
    inner: Arc<Mutex<Inner>>,
}

impl DeferredLoader {
    /// Returns a fresh loader for one request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffering state.
    pub fn state(&self) -> LoaderState {
        self.inner.lock().expect("lock poisoned").state
    }

    /// Records `key` in the pending batch and returns an unresolved handle.
    ///
    /// A call with an already-buffered key returns a handle backed by the
    /// same cell: at most one fetch per key per request.
    pub fn load_deferred(&self, key: &str) -> DeferredHandle {
        let mut inner = self.inner.lock().expect("lock poisoned");

        if let Some(cell) = inner.cells.get(key) {
            return DeferredHandle {
                key: key.to_string(),
                cell: cell.clone(),
            };
        }

        let cell = Arc::new(OnceCell::new());
        inner.cells.insert(key.to_string(), cell.clone());
        inner.pending.push(key.to_string());
        inner.state = LoaderState::Buffering;

        DeferredHandle {
            key: key.to_string(),
            cell,
        }
    }

    /// Closes the buffering window: fetches every pending key in one batch
    /// and fulfills the corresponding handles.
    ///
    /// A failed fetch fails all pending handles with the same error; a
    /// batch never partially succeeds silently. Dispatching with nothing
    /// pending is a no-op.
    pub async fn dispatch(&self, store: &dyn RecordStore) -> Result<(), LoaderError> {
        let (keys, cells) = {
            let mut inner = self.inner.lock().expect("lock poisoned");
            if inner.pending.is_empty() {
                return Ok(());
            }

            let keys = std::mem::take(&mut inner.pending);
            inner.state = LoaderState::Resolved;

            let cells: Vec<_> = keys
                .iter()
                .filter_map(|key| inner.cells.get(key).cloned())
                .collect();
            (keys, cells)
        };

        match store.fetch_record_batch(&keys).await {
            Ok(mut records) => {
                for (key, cell) in keys.iter().zip(cells) {
                    let record = records.remove(key).flatten();
                    let _ = cell.set(Ok(record));
                }
                Ok(())
            }
            Err(err) => {
                let error = LoaderError::BatchFailed(err.to_string());
                for cell in cells {
                    let _ = cell.set(Err(error.clone()));
                }
                Err(error)
            }
        }
    }

    /// Buffers `key`, closes the window if the handle is still unresolved
    /// and reads the outcome.
    ///
    /// Sibling resolvers that buffered keys before this point are fetched
    /// in the same batch; keys resolved by an earlier dispatch are answered
    /// from the cache without another fetch.
    pub async fn load(
        &self,
        key: &str,
        store: &dyn RecordStore,
    ) -> Result<Option<OptionsPageRecord>, LoaderError> {
        let handle = self.load_deferred(key);

        if !handle.is_resolved() {
            // The dispatch fills the handle's cell, also on failure; the
            // error is surfaced through the handle below.
            let _ = self.dispatch(store).await;
        }

        handle.value()
    }
}

impl fmt::Debug for DeferredLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().expect("lock poisoned");
        f.debug_struct("DeferredLoader")
            .field("state", &inner.state)
            .field("keys", &inner.cells.len())
            .field("pending", &inner.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::LoaderError;
    use crate::test_utils::MemoryRecordStore;

    use super::{DeferredLoader, LoaderState};

    #[tokio::test]
    async fn batches_pending_keys_into_one_fetch() {
        let store = MemoryRecordStore::with_pages(&["a", "b"]);
        let loader = DeferredLoader::new();

        let first = loader.load_deferred("a");
        let second = loader.load_deferred("b");
        let third = loader.load_deferred("a");

        assert!(first.shares_cell_with(&third));
        assert!(!first.shares_cell_with(&second));

        loader.dispatch(&store).await.unwrap();

        assert_eq!(store.batches(), vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(first.value().unwrap().unwrap().menu_slug, "a");
        assert_eq!(third.value().unwrap(), first.value().unwrap());
        assert_eq!(second.value().unwrap().unwrap().menu_slug, "b");
    }

    #[tokio::test]
    async fn transitions_between_states() {
        let store = MemoryRecordStore::with_pages(&["a"]);
        let loader = DeferredLoader::new();
        assert_eq!(loader.state(), LoaderState::Idle);

        loader.load_deferred("a");
        assert_eq!(loader.state(), LoaderState::Buffering);

        loader.dispatch(&store).await.unwrap();
        assert_eq!(loader.state(), LoaderState::Resolved);

        // A new key opens another buffering window within the same request.
        loader.load_deferred("b");
        assert_eq!(loader.state(), LoaderState::Buffering);
    }

    #[tokio::test]
    async fn missing_records_resolve_to_none() {
        let store = MemoryRecordStore::with_pages(&["known"]);
        let loader = DeferredLoader::new();

        let handle = loader.load_deferred("unknown");
        loader.dispatch(&store).await.unwrap();

        assert_eq!(handle.value().unwrap(), None);
    }

    #[tokio::test]
    async fn batch_failure_fails_every_handle() {
        let store = MemoryRecordStore::failing("record backend offline");
        let loader = DeferredLoader::new();

        let first = loader.load_deferred("a");
        let second = loader.load_deferred("b");

        let result = loader.dispatch(&store).await;
        assert!(result.is_err());

        for handle in [first, second] {
            match handle.value() {
                Err(LoaderError::BatchFailed(message)) => {
                    assert!(message.contains("record backend offline"));
                }
                other => panic!("Expected shared batch error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn resolved_keys_are_not_refetched() {
        let store = MemoryRecordStore::with_pages(&["a"]);
        let loader = DeferredLoader::new();

        assert!(loader.load("a", &store).await.unwrap().is_some());
        assert!(loader.load("a", &store).await.unwrap().is_some());

        assert_eq!(store.batches().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_handle_reports_missing_dispatch() {
        let loader = DeferredLoader::new();
        let handle = loader.load_deferred("a");

        assert_eq!(
            handle.value(),
            Err(LoaderError::NotDispatched("a".to_string()))
        );
    }
}
