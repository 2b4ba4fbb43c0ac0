//! Demonstrates the entity tables in a small pipeline session
//!
//! This example shows how to:
//! - Register containers, pods, processes and files
//! - Resolve the current view of a multi-state process
//! - Build and reuse a provenance tree
//! - Reset the tables at a window boundary
//!
//! Run with `RUST_LOG=debug` to see table activity.

use ouroboros_sftables::{
    Container, File, Foid, ObjectState, Oid, Pod, Process, SharedEntityTable, TableConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = TableConfig::from_env()?;
    println!("Using config: {:?}\n", config);
    let table = SharedEntityTable::with_config(config)?;

    // 1. Orchestration entities
    println!("1. Registering pod and container...");
    let mut pod = Pod::new("pod-7f3c", "checkout-5d8b9", "shop");
    pod.node_name = "worker-2".to_string();
    table.set_pod(pod.id.clone(), pod).await;

    let mut container = Container::new("3f2a9c", "checkout", "ghcr.io/acme/checkout:1.4");
    container.pod_id = Some("pod-7f3c".to_string());
    table.set_container(container.id.clone(), container).await;

    // 2. Process ancestry: containerd-shim (external) -> entrypoint -> shell -> curl
    println!("2. Registering processes...");
    let entry = Oid::new(4001, 1_700_000_000);
    let shell = Oid::new(4100, 1_700_000_050);
    let curl = Oid::new(4180, 1_700_000_090);

    let mut entry_proc = Process::new(entry, ObjectState::Created, "/app/checkout")
        .with_external_parent("worker-2/containerd-shim")
        .with_container("3f2a9c");
    entry_proc.entry = true;
    table.set_process(entry, entry_proc).await;

    table
        .set_process(
            shell,
            Process::new(shell, ObjectState::Created, "/bin/sh")
                .with_parent(entry)
                .with_container("3f2a9c"),
        )
        .await;
    table
        .set_process(
            shell,
            Process::new(shell, ObjectState::Modified, "/bin/sh")
                .with_parent(entry)
                .with_args("-c 'curl http://10.0.0.8/health'")
                .with_container("3f2a9c"),
        )
        .await;
    table
        .set_process(
            curl,
            Process::new(curl, ObjectState::Created, "/usr/bin/curl")
                .with_parent(shell)
                .with_args("http://10.0.0.8/health")
                .with_container("3f2a9c"),
        )
        .await;

    // 3. Files
    let foid = Foid::from_hex("9c1185a5c5e9fc54612808977ee8f548b2258d31")?;
    table.set_file(foid, File::new(foid, "/etc/resolv.conf")).await;

    // 4. Resolve
    println!("3. Resolving...");
    if let Some(proc) = table.get_process(&shell).await {
        println!("   Current view of {}: {} {} ({})", shell, proc.exe, proc.exe_args, proc.state);
    }

    let tree = table.get_provenance(&curl).await;
    println!("   Provenance of {}:", curl);
    for (depth, proc) in tree.iter().enumerate() {
        println!("   {}{} [{}]", "  ".repeat(depth), proc.exe, proc.oid);
    }

    if let Some(root) = tree.root() {
        if let Some(container_id) = &root.container_id {
            if let Some(container) = table.get_container(container_id).await {
                println!("   Root runs in container {} ({})", container.name, container.image);
            }
        }
    }

    if let Some(file) = table.get_file(&foid).await {
        println!("   File {} -> {}", foid, file.path);
    }

    // Second lookup is served from cache
    table.get_provenance(&curl).await;
    println!("\n{}\n", table.stats().await);

    // 5. Window boundary
    println!("4. Resetting tables...");
    table.reset().await;
    println!("{}", table.stats().await);

    Ok(())
}
