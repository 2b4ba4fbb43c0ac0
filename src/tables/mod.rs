//! # SysFlow Entity Tables
//!
//! In-process lookup tables for the telemetry entities a monitoring pipeline
//! observes: containers, pods, processes, files, and derived process ancestry
//! ("provenance") chains. Enrichment and export stages resolve identifiers found
//! in raw events against these tables instead of re-reading upstream state.
//!
//! ## Features
//!
//! - **Per-kind maps**: containers and pods keyed by string id, processes by [`Oid`],
//!   files by [`Foid`]. OIDs and FOIDs are distinct types and never share a map.
//! - **Multi-state processes**: one record per lifecycle state per OID, resolved by
//!   [`PROCESS_STATE_PRECEDENCE`] (MODIFIED, then CREATED, then REUP)
//! - **Provenance trees**: child-first ancestor chains, built iteratively with cycle
//!   detection and a depth limit, cached on first request until reset
//! - **Session windows**: [`EntityTable::reset`] swaps in empty maps and a new session id
//! - **Shared access**: [`SharedEntityTable`] puts the table behind a tokio `RwLock`
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_sftables::tables::{EntityTable, ObjectState, Oid, Process};
//!
//! let mut table = EntityTable::new();
//!
//! let init = Oid::new(1, 100);
//! let shell = Oid::new(200, 150);
//! table.set_process(init, Process::new(init, ObjectState::Created, "/sbin/init"));
//! table.set_process(
//!     shell,
//!     Process::new(shell, ObjectState::Created, "/bin/bash").with_parent(init),
//! );
//!
//! let tree = table.get_provenance(&shell);
//! assert_eq!(tree.oids(), vec![shell, init]);
//! ```

pub mod config;
pub mod provenance;
pub mod shared;
pub mod store;
pub mod types;

pub use config::{TableConfig, TableConfigBuilder};
pub use provenance::{build_provenance, resolve_current, ProcessSlots, PROCESS_STATE_PRECEDENCE};
pub use shared::SharedEntityTable;
pub use store::EntityTable;
pub use types::{
    Container, ContainerKind, File, Foid, ObjectState, Oid, ParentRef, Pod, Process,
    ProvenanceTree, TableStats,
};
