//! Entity table: container, pod, process, file and provenance maps

use crate::error::Result;
use crate::tables::{
    config::TableConfig,
    provenance::{build_provenance, resolve_current, ProcessSlots},
    types::{Container, File, Foid, ObjectState, Oid, Pod, Process, ProvenanceTree, TableStats},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lookup tables for the entities seen during one session window
///
/// Writers upsert records with the `set_*` methods; readers resolve identifiers
/// with the `get_*` methods. Lookups of unknown identifiers return `None`.
///
/// The table has a single owner. Writes and [`get_provenance`](Self::get_provenance)
/// take `&mut self`; wrap it in a [`SharedEntityTable`](crate::tables::SharedEntityTable)
/// to share it between pipeline stages.
#[derive(Debug)]
pub struct EntityTable {
    config: TableConfig,
    maps: TableMaps,
    session_id: Uuid,
    session_started: DateTime<Utc>,
    counters: Counters,
}

/// Backing storage, replaced wholesale on reset
#[derive(Debug, Default)]
struct TableMaps {
    containers: HashMap<String, Arc<Container>>,
    pods: HashMap<String, Arc<Pod>>,
    processes: HashMap<Oid, ProcessSlots>,
    files: HashMap<Foid, Arc<File>>,
    ptrees: HashMap<Oid, Arc<ProvenanceTree>>,
}

impl TableMaps {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            containers: HashMap::with_capacity(capacity),
            pods: HashMap::with_capacity(capacity),
            processes: HashMap::with_capacity(capacity),
            files: HashMap::with_capacity(capacity),
            ptrees: HashMap::with_capacity(capacity),
        }
    }
}

/// Provenance counters; hits are recorded through `&self` by shared readers
#[derive(Debug, Default)]
struct Counters {
    provenance_hits: AtomicU64,
    provenance_misses: AtomicU64,
    cycles_detected: AtomicU64,
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTable {
    /// Create an empty table with default configuration
    pub fn new() -> Self {
        Self::from_valid_config(TableConfig::default())
    }

    /// Create an empty table, validating the configuration first
    pub fn with_config(config: TableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TableConfig) -> Self {
        let table = Self {
            maps: TableMaps::with_capacity(config.initial_capacity),
            config,
            session_id: Uuid::new_v4(),
            session_started: Utc::now(),
            counters: Counters::default(),
        };

        info!("Initialized entity table (session {})", table.session_id);
        table
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Identifier of the current session window
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Start time of the current session window
    pub fn session_started(&self) -> DateTime<Utc> {
        self.session_started
    }

    /// Get a container by id
    pub fn get_container(&self, id: &str) -> Option<Arc<Container>> {
        self.maps.containers.get(id).cloned()
    }

    /// Store a container, replacing any record under the same id
    pub fn set_container(&mut self, id: impl Into<String>, container: Container) {
        self.maps.containers.insert(id.into(), Arc::new(container));
    }

    /// Get a pod by id
    pub fn get_pod(&self, id: &str) -> Option<Arc<Pod>> {
        self.maps.pods.get(id).cloned()
    }

    /// Store a pod, replacing any record under the same id
    pub fn set_pod(&mut self, id: impl Into<String>, pod: Pod) {
        self.maps.pods.insert(id.into(), Arc::new(pod));
    }

    /// Get a file by file object id
    pub fn get_file(&self, id: &Foid) -> Option<Arc<File>> {
        self.maps.files.get(id).cloned()
    }

    /// Store a file, replacing any record under the same id
    pub fn set_file(&mut self, id: Foid, file: File) {
        self.maps.files.insert(id, Arc::new(file));
    }

    /// Get the current view of a process
    ///
    /// Resolves across lifecycle states using
    /// [`PROCESS_STATE_PRECEDENCE`](crate::tables::PROCESS_STATE_PRECEDENCE).
    pub fn get_process(&self, id: &Oid) -> Option<Arc<Process>> {
        self.maps.processes.get(id).and_then(resolve_current).cloned()
    }

    /// Get the record stored for one specific lifecycle state of a process
    pub fn get_process_state(&self, id: &Oid, state: ObjectState) -> Option<Arc<Process>> {
        self.maps.processes.get(id).and_then(|slots| slots.get(state)).cloned()
    }

    /// Store a process in the slot for its own lifecycle state
    ///
    /// Records held for the other states of the same OID are left alone.
    pub fn set_process(&mut self, id: Oid, process: Process) {
        self.maps
            .processes
            .entry(id)
            .or_default()
            .insert(Arc::new(process));
    }

    /// Get the ancestor chain of a process, child first
    ///
    /// The chain is computed on first request and cached until [`reset`](Self::reset).
    /// Later process updates don't change a cached chain. Unknown OIDs yield an
    /// empty tree, which is cached like any other.
    pub fn get_provenance(&mut self, id: &Oid) -> Arc<ProvenanceTree> {
        if let Some(tree) = self.cached_provenance(id) {
            return tree;
        }

        let tree = Arc::new(build_provenance(
            &self.maps.processes,
            id,
            self.config.max_provenance_depth,
        ));

        if self.config.enable_metrics {
            self.counters.provenance_misses.fetch_add(1, Ordering::Relaxed);
            if tree.has_cycle() {
                self.counters.cycles_detected.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.maps.ptrees.insert(*id, Arc::clone(&tree));
        tree
    }

    /// Get a cached ancestor chain without computing one, counting the hit
    pub(crate) fn cached_provenance(&self, id: &Oid) -> Option<Arc<ProvenanceTree>> {
        let tree = self.maps.ptrees.get(id).cloned()?;
        if self.config.enable_metrics {
            self.counters.provenance_hits.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Provenance cache hit: {}", id);
        Some(tree)
    }

    /// Drop every entity and provenance tree and start a new session window
    pub fn reset(&mut self) {
        let dropped = self.stats();
        self.maps = TableMaps::with_capacity(self.config.initial_capacity);
        self.counters = Counters::default();
        self.session_id = Uuid::new_v4();
        self.session_started = Utc::now();

        info!(
            "Reset entity table: dropped {} entities and {} provenance trees (session {} -> {})",
            dropped.total_entities(),
            dropped.provenance_trees,
            dropped.session_id,
            self.session_id
        );
    }

    /// True when no entity or provenance tree is held
    pub fn is_empty(&self) -> bool {
        self.maps.containers.is_empty()
            && self.maps.pods.is_empty()
            && self.maps.processes.is_empty()
            && self.maps.files.is_empty()
            && self.maps.ptrees.is_empty()
    }

    /// Snapshot of table occupancy and provenance counters
    pub fn stats(&self) -> TableStats {
        TableStats {
            session_id: self.session_id,
            session_started: self.session_started,
            containers: self.maps.containers.len(),
            pods: self.maps.pods.len(),
            processes: self.maps.processes.len(),
            process_records: self
                .maps
                .processes
                .values()
                .map(ProcessSlots::occupied)
                .sum(),
            files: self.maps.files.len(),
            provenance_trees: self.maps.ptrees.len(),
            provenance_hits: self.counters.provenance_hits.load(Ordering::Relaxed),
            provenance_misses: self.counters.provenance_misses.load(Ordering::Relaxed),
            cycles_detected: self.counters.cycles_detected.load(Ordering::Relaxed),
        }
    }
}
