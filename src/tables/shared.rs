//! Shared entity table for concurrent pipeline stages
//!
//! Single writer, many readers: lookups take the read lock, writes and resets
//! take the write lock. A reset swaps in a freshly allocated table under the
//! write lock, so readers see either the old window or the new one, never a
//! partially-cleared table.

use crate::error::Result;
use crate::tables::{
    config::TableConfig,
    store::EntityTable,
    types::{Container, File, Foid, ObjectState, Oid, Pod, Process, ProvenanceTree, TableStats},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Cloneable handle to an [`EntityTable`] behind an async reader-writer lock
#[derive(Debug, Clone)]
pub struct SharedEntityTable {
    inner: Arc<RwLock<EntityTable>>,
}

impl Default for SharedEntityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedEntityTable {
    /// Create an empty shared table with default configuration
    pub fn new() -> Self {
        Self::from_table(EntityTable::new())
    }

    /// Create an empty shared table, validating the configuration first
    pub fn with_config(config: TableConfig) -> Result<Self> {
        Ok(Self::from_table(EntityTable::with_config(config)?))
    }

    /// Share an existing table
    pub fn from_table(table: EntityTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    pub async fn get_container(&self, id: &str) -> Option<Arc<Container>> {
        self.inner.read().await.get_container(id)
    }

    pub async fn set_container(&self, id: impl Into<String>, container: Container) {
        self.inner.write().await.set_container(id, container);
    }

    pub async fn get_pod(&self, id: &str) -> Option<Arc<Pod>> {
        self.inner.read().await.get_pod(id)
    }

    pub async fn set_pod(&self, id: impl Into<String>, pod: Pod) {
        self.inner.write().await.set_pod(id, pod);
    }

    pub async fn get_file(&self, id: &Foid) -> Option<Arc<File>> {
        self.inner.read().await.get_file(id)
    }

    pub async fn set_file(&self, id: Foid, file: File) {
        self.inner.write().await.set_file(id, file);
    }

    pub async fn get_process(&self, id: &Oid) -> Option<Arc<Process>> {
        self.inner.read().await.get_process(id)
    }

    pub async fn get_process_state(&self, id: &Oid, state: ObjectState) -> Option<Arc<Process>> {
        self.inner.read().await.get_process_state(id, state)
    }

    pub async fn set_process(&self, id: Oid, process: Process) {
        self.inner.write().await.set_process(id, process);
    }

    /// Get the ancestor chain of a process, computing and caching it on first request
    ///
    /// Cached trees are served under the read lock. On a miss the write lock is
    /// taken and the cache checked again, so concurrent first requests for the
    /// same OID all receive the same tree.
    pub async fn get_provenance(&self, id: &Oid) -> Arc<ProvenanceTree> {
        if let Some(tree) = self.inner.read().await.cached_provenance(id) {
            return tree;
        }

        debug!("Provenance cache miss, taking write lock: {}", id);
        self.inner.write().await.get_provenance(id)
    }

    /// Replace every map with fresh empty ones and start a new session window
    pub async fn reset(&self) {
        self.inner.write().await.reset();
    }

    pub async fn session_id(&self) -> Uuid {
        self.inner.read().await.session_id()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn stats(&self) -> TableStats {
        self.inner.read().await.stats()
    }
}
