//! # Ouroboros SysFlow Tables (ouroboros-sftables)
//!
//! Lookup cache for telemetry entities captured by a monitoring pipeline.
//!
//! ## Features
//!
//! - Container, pod, process and file tables with upsert semantics
//! - Process lifecycle states resolved to a single current view
//! - Cached process ancestry (provenance) chains with cycle detection
//! - Wholesale reset between processing windows
//! - Async shared handle for concurrent pipeline stages
//!
//! ## Shared Table
//!
//! One stage writes observations while others resolve identifiers:
//!
//! ```no_run
//! use ouroboros_sftables::{Container, SharedEntityTable, TableConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let table = SharedEntityTable::with_config(TableConfig::from_env()?)?;
//!
//!     let writer = table.clone();
//!     tokio::spawn(async move {
//!         writer
//!             .set_container("3f2a9c", Container::new("3f2a9c", "web", "nginx:1.27"))
//!             .await;
//!     })
//!     .await?;
//!
//!     if let Some(container) = table.get_container("3f2a9c").await {
//!         println!("Resolved container: {}", container.name);
//!     }
//!
//!     // Window boundary
//!     table.reset().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod tables;

// Re-export main types for convenience
pub use error::{Result, TableError};
pub use tables::{
    Container, ContainerKind, EntityTable, File, Foid, ObjectState, Oid, ParentRef, Pod, Process,
    ProvenanceTree, SharedEntityTable, TableConfig, TableConfigBuilder, TableStats,
    PROCESS_STATE_PRECEDENCE,
};
