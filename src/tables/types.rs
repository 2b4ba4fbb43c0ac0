//! Entity records and identifiers held by the tables

use crate::error::{Result, TableError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Process object identifier: host pid plus process creation timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Oid {
    /// Host process id
    pub hpid: i64,
    /// Creation timestamp (nanoseconds since epoch)
    pub create_ts: i64,
}

impl Oid {
    pub fn new(hpid: i64, create_ts: i64) -> Self {
        Self { hpid, create_ts }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hpid, self.create_ts)
    }
}

impl FromStr for Oid {
    type Err = TableError;

    /// Parse an OID written as `<hpid>:<create_ts>`
    fn from_str(s: &str) -> Result<Self> {
        let (hpid, create_ts) = s
            .split_once(':')
            .ok_or_else(|| TableError::InvalidIdentifier(s.to_string()))?;

        let hpid = hpid
            .trim()
            .parse()
            .map_err(|_| TableError::InvalidIdentifier(s.to_string()))?;
        let create_ts = create_ts
            .trim()
            .parse()
            .map_err(|_| TableError::InvalidIdentifier(s.to_string()))?;

        Ok(Self { hpid, create_ts })
    }
}

/// File object identifier (20-byte path hash)
///
/// Lives in its own key space: a `Foid` can never be used to look up a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Foid(pub [u8; 20]);

impl Foid {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a FOID from its 40-character hex form
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 40 || !s.is_ascii() {
            return Err(TableError::InvalidIdentifier(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| TableError::InvalidIdentifier(s.to_string()))?;
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for Foid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Lifecycle state of an observed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectState {
    /// First observation
    Created = 0,
    /// Updated in place
    Modified = 1,
    /// Re-observed after a gap
    Reup = 2,
}

impl ObjectState {
    /// Number of distinct states; sizes the per-OID slot array
    pub const COUNT: usize = 3;

    /// All states in declaration order
    pub const ALL: [ObjectState; ObjectState::COUNT] =
        [ObjectState::Created, ObjectState::Modified, ObjectState::Reup];

    /// Slot index of this state
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectState::Created => "CREATED",
            ObjectState::Modified => "MODIFIED",
            ObjectState::Reup => "REUP",
        }
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a process to its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRef {
    /// Parent is a process that may be held in this table
    Local(Oid),
    /// Parent is resolved outside this table; the chain stops here
    External(String),
}

impl ParentRef {
    /// The local parent OID, if any
    pub fn local_oid(&self) -> Option<Oid> {
        match self {
            ParentRef::Local(oid) => Some(*oid),
            ParentRef::External(_) => None,
        }
    }
}

/// Container runtime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    #[default]
    Docker,
    Lxc,
    Libvirt,
    Mesos,
    Rkt,
    Custom,
    Cri,
    Containerd,
    Crio,
}

/// Container record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub kind: ContainerKind,
    pub privileged: bool,
    /// Owning pod, when orchestrated
    pub pod_id: Option<String>,
}

impl Container {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: image.into(),
            image_id: String::new(),
            kind: ContainerKind::default(),
            privileged: false,
            pod_id: None,
        }
    }
}

/// Pod record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub id: String,
    pub name: String,
    pub node_name: String,
    pub namespace: String,
    pub host_ips: Vec<String>,
    pub internal_ips: Vec<String>,
    pub restart_count: i64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Pod {
    pub fn new(id: impl Into<String>, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_name: String::new(),
            namespace: namespace.into(),
            host_ips: Vec::new(),
            internal_ips: Vec::new(),
            restart_count: 0,
            labels: HashMap::new(),
        }
    }
}

/// Process record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Lifecycle state of this observation; selects the storage slot
    pub state: ObjectState,
    pub oid: Oid,
    /// Parent reference, absent for roots
    pub poid: Option<ParentRef>,
    /// Observation timestamp (nanoseconds since epoch)
    pub ts: i64,
    pub exe: String,
    pub exe_args: String,
    pub uid: i32,
    pub user_name: String,
    pub gid: i32,
    pub group_name: String,
    pub tty: bool,
    pub container_id: Option<String>,
    /// Container entrypoint process
    pub entry: bool,
}

impl Process {
    pub fn new(oid: Oid, state: ObjectState, exe: impl Into<String>) -> Self {
        Self {
            state,
            oid,
            poid: None,
            ts: oid.create_ts,
            exe: exe.into(),
            exe_args: String::new(),
            uid: 0,
            user_name: String::new(),
            gid: 0,
            group_name: String::new(),
            tty: false,
            container_id: None,
            entry: false,
        }
    }

    /// Set a local parent
    pub fn with_parent(mut self, parent: Oid) -> Self {
        self.poid = Some(ParentRef::Local(parent));
        self
    }

    /// Set a parent that is resolved outside this table
    pub fn with_external_parent(mut self, reference: impl Into<String>) -> Self {
        self.poid = Some(ParentRef::External(reference.into()));
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.exe_args = args.into();
        self
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Local parent OID, if the parent lives in this table's key space
    pub fn parent_oid(&self) -> Option<Oid> {
        self.poid.as_ref().and_then(ParentRef::local_oid)
    }
}

/// File record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub state: ObjectState,
    pub oid: Foid,
    pub ts: i64,
    /// Resource type tag (`f` file, `d` directory, `p` pipe, ...)
    pub restype: char,
    pub path: String,
    pub container_id: Option<String>,
}

impl File {
    pub fn new(oid: Foid, path: impl Into<String>) -> Self {
        Self {
            state: ObjectState::Created,
            oid,
            ts: 0,
            restype: 'f',
            path: path.into(),
            container_id: None,
        }
    }
}

/// Ancestor chain of a process, child first, then ancestors root-ward
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceTree {
    /// Processes in child-first order
    pub processes: Vec<Arc<Process>>,

    /// OID that reappeared in the chain, if the parent links formed a cycle
    pub cycle_at: Option<Oid>,

    /// True when the walk hit the configured depth limit
    pub truncated: bool,
}

impl ProvenanceTree {
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Process>> {
        self.processes.iter()
    }

    /// The queried process
    pub fn leaf(&self) -> Option<&Arc<Process>> {
        self.processes.first()
    }

    /// Outermost ancestor resolvable in the table
    pub fn root(&self) -> Option<&Arc<Process>> {
        self.processes.last()
    }

    pub fn has_cycle(&self) -> bool {
        self.cycle_at.is_some()
    }

    /// OIDs along the chain, child first
    pub fn oids(&self) -> Vec<Oid> {
        self.processes.iter().map(|p| p.oid).collect()
    }
}

/// Snapshot of table occupancy and provenance cache activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStats {
    /// Current session window
    pub session_id: Uuid,

    /// When the current window began
    pub session_started: DateTime<Utc>,

    pub containers: usize,
    pub pods: usize,

    /// Distinct process OIDs
    pub processes: usize,

    /// Process records across all lifecycle states
    pub process_records: usize,

    pub files: usize,

    /// Cached provenance trees
    pub provenance_trees: usize,

    /// Provenance lookups served from cache
    pub provenance_hits: u64,

    /// Provenance lookups that computed a new tree
    pub provenance_misses: u64,

    /// Computed trees whose parent chain contained a cycle
    pub cycles_detected: u64,
}

impl TableStats {
    /// Provenance cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.provenance_hits + self.provenance_misses;
        if total == 0 {
            0.0
        } else {
            (self.provenance_hits as f64 / total as f64) * 100.0
        }
    }

    /// Total entities across the four entity maps
    pub fn total_entities(&self) -> usize {
        self.containers + self.pods + self.processes + self.files
    }
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TableStats {{ session: {}, containers: {}, pods: {}, processes: {} ({} records), files: {}, ptrees: {}, hit_rate: {:.2}%, cycles: {} }}",
            self.session_id,
            self.containers,
            self.pods,
            self.processes,
            self.process_records,
            self.files,
            self.provenance_trees,
            self.hit_rate(),
            self.cycles_detected
        )
    }
}
