//! Integration tests for the entity tables
//!
//! These tests verify the complete table behavior including:
//! - Lookups of unknown identifiers
//! - Process state precedence
//! - Provenance ordering, snapshot caching and termination
//! - Key space separation between processes and files
//! - Reset across every entity kind
//! - Concurrent readers on the shared table

use futures::future::join_all;
use ouroboros_sftables::tables::{
    Container, EntityTable, File, Foid, ObjectState, Oid, Pod, Process, SharedEntityTable,
    TableConfig,
};
use std::sync::Arc;
use tokio::sync::Barrier;

fn oid(hpid: i64) -> Oid {
    Oid::new(hpid, 1_700_000_000)
}

/// A (1, root) <- B (2) <- C (3)
fn three_generations(table: &mut EntityTable) {
    table.set_process(oid(1), Process::new(oid(1), ObjectState::Created, "/sbin/init"));
    table.set_process(
        oid(2),
        Process::new(oid(2), ObjectState::Created, "/bin/bash").with_parent(oid(1)),
    );
    table.set_process(
        oid(3),
        Process::new(oid(3), ObjectState::Created, "/usr/bin/curl").with_parent(oid(2)),
    );
}

#[test]
fn test_unset_process_not_found() {
    let mut table = EntityTable::new();

    for hpid in [0, 1, 42, i64::MAX] {
        assert!(table.get_process(&oid(hpid)).is_none());
        assert!(table.get_provenance(&oid(hpid)).is_empty());
    }
}

#[test]
fn test_modified_wins_over_created_and_reup() {
    let mut table = EntityTable::new();
    let id = oid(10);

    table.set_process(id, Process::new(id, ObjectState::Created, "/bin/created"));
    table.set_process(id, Process::new(id, ObjectState::Modified, "/bin/modified"));
    assert_eq!(table.get_process(&id).unwrap().state, ObjectState::Modified);

    table.set_process(id, Process::new(id, ObjectState::Reup, "/bin/reup"));
    let current = table.get_process(&id).unwrap();
    assert_eq!(current.state, ObjectState::Modified);
    assert_eq!(current.exe, "/bin/modified");
}

#[test]
fn test_container_upsert() {
    let mut table = EntityTable::new();
    let r = Container::new("c1", "api", "ghcr.io/acme/api:1.0");
    let r2 = Container::new("c1", "api", "ghcr.io/acme/api:2.0");

    table.set_container("c1", r.clone());
    table.set_container("c1", r.clone());
    assert_eq!(*table.get_container("c1").unwrap(), r);

    table.set_container("c1", r2.clone());
    assert_eq!(*table.get_container("c1").unwrap(), r2);
}

#[test]
fn test_provenance_ordering() {
    let mut table = EntityTable::new();
    three_generations(&mut table);

    let tree = table.get_provenance(&oid(3));
    let exes: Vec<&str> = tree.iter().map(|p| p.exe.as_str()).collect();
    assert_eq!(exes, vec!["/usr/bin/curl", "/bin/bash", "/sbin/init"]);
    assert_eq!(tree.leaf().unwrap().oid, oid(3));
    assert_eq!(tree.root().unwrap().oid, oid(1));
}

#[test]
fn test_provenance_is_snapshot() {
    let mut table = EntityTable::new();
    three_generations(&mut table);

    let before = table.get_provenance(&oid(3));

    table.set_process(
        oid(2),
        Process::new(oid(2), ObjectState::Modified, "/bin/zsh").with_parent(oid(1)),
    );
    assert_eq!(table.get_process(&oid(2)).unwrap().exe, "/bin/zsh");

    let after = table.get_provenance(&oid(3));
    assert_eq!(after.oids(), vec![oid(3), oid(2), oid(1)]);
    assert_eq!(after.processes[1].exe, "/bin/bash");
    assert_eq!(*before, *after);

    // Trees for other OIDs computed after the update see the new record
    let fresh = table.get_provenance(&oid(2));
    assert_eq!(fresh.leaf().unwrap().exe, "/bin/zsh");
}

#[test]
fn test_external_parent_stops_chain() {
    let mut table = EntityTable::new();
    three_generations(&mut table);
    table.set_process(
        oid(4),
        Process::new(oid(4), ObjectState::Created, "/usr/sbin/sshd")
            .with_external_parent("node-7/containerd-shim"),
    );

    let tree = table.get_provenance(&oid(4));
    assert_eq!(tree.oids(), vec![oid(4)]);
}

// Hardening beyond plain recursion: cyclic parent links terminate and are flagged
#[test]
fn test_cyclic_chain_terminates() {
    let mut table = EntityTable::new();
    table.set_process(
        oid(1),
        Process::new(oid(1), ObjectState::Created, "/bin/a").with_parent(oid(3)),
    );
    table.set_process(
        oid(2),
        Process::new(oid(2), ObjectState::Created, "/bin/b").with_parent(oid(1)),
    );
    table.set_process(
        oid(3),
        Process::new(oid(3), ObjectState::Created, "/bin/c").with_parent(oid(2)),
    );

    let tree = table.get_provenance(&oid(3));
    assert_eq!(tree.oids(), vec![oid(3), oid(2), oid(1)]);
    assert_eq!(tree.cycle_at, Some(oid(3)));
    assert_eq!(table.stats().cycles_detected, 1);
}

#[test]
fn test_deep_chain_respects_depth_limit() {
    let config = TableConfig::builder().max_provenance_depth(50).build();
    let mut table = EntityTable::with_config(config).unwrap();

    table.set_process(oid(0), Process::new(oid(0), ObjectState::Created, "/sbin/init"));
    for i in 1..200 {
        table.set_process(
            oid(i),
            Process::new(oid(i), ObjectState::Created, "/bin/sh").with_parent(oid(i - 1)),
        );
    }

    let tree = table.get_provenance(&oid(199));
    assert_eq!(tree.len(), 50);
    assert!(tree.truncated);
    assert!(!tree.has_cycle());
}

#[test]
fn test_reset_clears_all_kinds() {
    let mut table = EntityTable::new();
    let foid = Foid::new([3; 20]);
    three_generations(&mut table);
    table.set_container("c1", Container::new("c1", "api", "acme/api"));
    table.set_pod("p1", Pod::new("p1", "api-0", "prod"));
    table.set_file(foid, File::new(foid, "/var/log/app.log"));
    assert_eq!(table.get_provenance(&oid(3)).len(), 3);

    table.reset();

    assert!(table.get_container("c1").is_none());
    assert!(table.get_pod("p1").is_none());
    assert!(table.get_file(&foid).is_none());
    for hpid in 1..=3 {
        assert!(table.get_process(&oid(hpid)).is_none());
    }
    assert!(table.get_provenance(&oid(3)).is_empty());

    let stats = table.stats();
    assert_eq!(stats.total_entities(), 0);
}

#[test]
fn test_file_and_process_keys_do_not_collide() {
    let mut table = EntityTable::new();

    // FOID whose leading bytes carry the same bit pattern as the OID below
    let id = Oid::new(0x0102_0304_0506_0708, 0x1112_1314_1516_1718);
    let mut bytes = [0u8; 20];
    bytes[..8].copy_from_slice(&id.hpid.to_be_bytes());
    bytes[8..16].copy_from_slice(&id.create_ts.to_be_bytes());
    let foid = Foid::new(bytes);

    table.set_file(foid, File::new(foid, "/tmp/payload"));
    assert!(table.get_process(&id).is_none());

    table.set_process(id, Process::new(id, ObjectState::Created, "/tmp/payload"));
    assert_eq!(table.get_file(&foid).unwrap().path, "/tmp/payload");
    assert_eq!(table.get_process(&id).unwrap().exe, "/tmp/payload");

    let stats = table.stats();
    assert_eq!(stats.files, 1);
    assert_eq!(stats.processes, 1);
}

#[test]
fn test_records_deserialize_from_json() {
    let raw = r#"{
        "state": "MODIFIED",
        "oid": { "hpid": 812, "create_ts": 1700000123 },
        "poid": { "local": { "hpid": 1, "create_ts": 1700000000 } },
        "ts": 1700000456,
        "exe": "/usr/bin/python3",
        "exe_args": "-m http.server",
        "uid": 1000,
        "user_name": "app",
        "gid": 1000,
        "group_name": "app",
        "tty": false,
        "container_id": "3f2a9c",
        "entry": true
    }"#;

    let process: Process = serde_json::from_str(raw).unwrap();
    assert_eq!(process.state, ObjectState::Modified);
    assert_eq!(process.parent_oid(), Some(Oid::new(1, 1_700_000_000)));

    let mut table = EntityTable::new();
    table.set_process(process.oid, process.clone());
    assert_eq!(*table.get_process(&Oid::new(812, 1_700_000_123)).unwrap(), process);
}

#[tokio::test]
async fn test_shared_concurrent_readers() {
    let table = SharedEntityTable::new();
    let mut seed = EntityTable::new();
    three_generations(&mut seed);
    for hpid in 1..=3 {
        let process = seed.get_process(&oid(hpid)).unwrap();
        table.set_process(oid(hpid), (*process).clone()).await;
    }

    let readers = (0..16).map(|_| {
        let table = table.clone();
        tokio::spawn(async move { table.get_provenance(&oid(3)).await })
    });
    let trees: Vec<_> = join_all(readers)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    for tree in &trees {
        assert_eq!(tree.oids(), vec![oid(3), oid(2), oid(1)]);
        assert!(Arc::ptr_eq(tree, &trees[0]));
    }

    let stats = table.stats().await;
    assert_eq!(stats.provenance_misses, 1);
    assert_eq!(stats.provenance_hits, 15);
    assert_eq!(stats.provenance_trees, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_reset_is_atomic_for_readers() {
    const READERS: usize = 8;

    let table = SharedEntityTable::new();
    for i in 0..100 {
        let id = format!("c{}", i);
        table
            .set_container(id.clone(), Container::new(id, "svc", "acme/svc"))
            .await;
    }

    let start = Arc::new(Barrier::new(READERS + 1));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let table = table.clone();
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                // One read of the full window before the reset can be released
                let mut seen = vec![table.stats().await.containers];
                start.wait().await;
                for _ in 0..200 {
                    seen.push(table.stats().await.containers);
                    tokio::task::yield_now().await;
                }
                seen
            })
        })
        .collect();

    start.wait().await;
    table.reset().await;

    let mut full_reads = 0;
    for reader in join_all(readers).await {
        let seen = reader.unwrap();
        assert!(seen.iter().all(|count| *count == 0 || *count == 100));
        full_reads += seen.iter().filter(|count| **count == 100).count();
    }
    assert!(full_reads >= READERS);
    assert!(table.is_empty().await);
}
