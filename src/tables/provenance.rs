//! Process state resolution and ancestor chain reconstruction
//!
//! A process OID can hold up to one record per [`ObjectState`]. Readers want a
//! single current view, picked by [`PROCESS_STATE_PRECEDENCE`]. Provenance
//! walks parent links from a process towards the root, resolving each ancestor
//! through the same precedence.

use crate::tables::types::{ObjectState, Oid, Process, ProvenanceTree};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Order in which lifecycle states are consulted when resolving a process
pub const PROCESS_STATE_PRECEDENCE: [ObjectState; ObjectState::COUNT] =
    [ObjectState::Modified, ObjectState::Created, ObjectState::Reup];

/// Per-OID process records, one slot per lifecycle state
#[derive(Debug, Clone, Default)]
pub struct ProcessSlots {
    slots: [Option<Arc<Process>>; ObjectState::COUNT],
}

impl ProcessSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record in the slot of its own state, returning the record it replaced
    pub fn insert(&mut self, process: Arc<Process>) -> Option<Arc<Process>> {
        let index = process.state.index();
        self.slots[index].replace(process)
    }

    pub fn get(&self, state: ObjectState) -> Option<&Arc<Process>> {
        self.slots[state.index()].as_ref()
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied() == 0
    }
}

/// Pick the current record from a slot array
pub fn resolve_current(slots: &ProcessSlots) -> Option<&Arc<Process>> {
    PROCESS_STATE_PRECEDENCE
        .iter()
        .find_map(|state| slots.get(*state))
}

/// Build the ancestor chain for `oid`
///
/// The walk stops at a process with no parent, an external parent, a parent
/// missing from `processes`, a repeated OID (recorded in `cycle_at`), or after
/// `max_depth` processes (recorded in `truncated`). A resolvable `oid` always
/// yields at least itself, even when `max_depth` is 0.
pub fn build_provenance(
    processes: &HashMap<Oid, ProcessSlots>,
    oid: &Oid,
    max_depth: usize,
) -> ProvenanceTree {
    let max_depth = max_depth.max(1);
    let mut tree = ProvenanceTree::default();
    let mut visited: HashSet<Oid> = HashSet::new();
    let mut next = Some(*oid);

    while let Some(current) = next.take() {
        let Some(process) = processes.get(&current).and_then(resolve_current) else {
            break;
        };

        if !visited.insert(current) {
            warn!("Cycle in process ancestry of {} at {}", oid, current);
            tree.cycle_at = Some(current);
            break;
        }

        if tree.processes.len() >= max_depth {
            warn!("Provenance of {} truncated at depth {}", oid, max_depth);
            tree.truncated = true;
            break;
        }

        tree.processes.push(Arc::clone(process));
        next = process.parent_oid();
    }

    debug!("Built provenance for {}: {} processes", oid, tree.len());
    tree
}
