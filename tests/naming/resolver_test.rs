/*!
 * Resolver Tests
 * Lookups through a chain of local, directory and discovery backends
 */

use super::fakes::{BrokenRegistry, MemoryBrowser, MemoryDirectory, PingRuntime};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use taskhost::{
    DiscoveryRegistry, Handle, HandleMap, LocalRegistry, Registry, RegistryError,
    RemoteDirectory, Resolver,
};

fn local(entries: &[(&str, &str)]) -> Arc<dyn Registry> {
    let handles: HandleMap = entries
        .iter()
        .map(|(name, address)| (name.to_string(), Handle::new(*address, *name)))
        .collect();
    Arc::new(LocalRegistry::from_handles(&handles))
}

fn directory(client: &Arc<MemoryDirectory>) -> Arc<dyn Registry> {
    Arc::new(RemoteDirectory::new(client.clone()))
}

#[tokio::test]
async fn test_first_backend_wins() {
    let client = Arc::new(MemoryDirectory::with(
        "corbaloc:host",
        &[("camera", "IOR:remote"), ("lidar", "IOR:lidar")],
    ));
    let local = local(&[("camera", "IOR:local")]);
    let remote = directory(&client);

    let resolver = Resolver::new();
    resolver.add(local.clone());
    resolver.add(remote.clone());

    assert_eq!(resolver.get("camera").await.unwrap().address(), "IOR:local");
    assert_eq!(resolver.get("lidar").await.unwrap().address(), "IOR:lidar");

    resolver.add_front(remote.clone());
    assert_eq!(resolver.len(), 2);
    assert_eq!(resolver.get("camera").await.unwrap().address(), "IOR:remote");

    assert!(resolver.remove(&remote));
    assert!(!resolver.remove(&remote));
    assert!(matches!(
        resolver.get("lidar").await,
        Err(RegistryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_skipped() {
    let client = Arc::new(MemoryDirectory::with("corbaloc:host", &[("camera", "IOR:remote")]));
    client.set_down(true);

    let resolver = Resolver::new();
    resolver.add(directory(&client));
    resolver.add(local(&[("camera", "IOR:local")]));

    assert_eq!(resolver.get("camera").await.unwrap().address(), "IOR:local");

    match resolver.get("gripper").await {
        Err(RegistryError::NotFound { name, consulted }) => {
            assert_eq!(name, "gripper");
            assert_eq!(consulted, vec!["Directory:corbaloc:host", "Local"]);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_names_are_merged_without_duplicates() {
    let client = Arc::new(MemoryDirectory::with(
        "corbaloc:host",
        &[("camera", "IOR:remote"), ("lidar", "IOR:lidar")],
    ));

    let resolver = Resolver::new();
    resolver.add(local(&[("camera", "IOR:local"), ("arm", "IOR:arm")]));
    resolver.add(Arc::new(BrokenRegistry));
    resolver.add(directory(&client));

    assert_eq!(resolver.names().await, vec!["arm", "camera", "lidar"]);
}

#[tokio::test]
async fn test_cleanup_failures_are_isolated() {
    let client = Arc::new(MemoryDirectory::with(
        "corbaloc:host",
        &[("alive", "IOR:alive"), ("dead", "IOR:dead")],
    ));
    let runtime = Arc::new(PingRuntime::answering(&["IOR:alive"]));
    let remote = Arc::new(RemoteDirectory::new(client.clone()).with_runtime(runtime));

    let resolver = Resolver::new();
    resolver.add(Arc::new(BrokenRegistry));
    resolver.add(remote);

    assert_eq!(resolver.cleanup().await, 1);
    assert_eq!(
        client.bound.lock().keys().cloned().collect::<Vec<_>>(),
        vec!["alive"]
    );
}

#[tokio::test]
async fn test_foreign_namespace_is_not_consulted() {
    let client = Arc::new(MemoryDirectory::with("corbaloc:lab", &[("camera", "IOR:cam")]));
    let remote: Arc<dyn Registry> =
        Arc::new(RemoteDirectory::new(client.clone()).with_namespace("lab").unwrap());

    let resolver = Resolver::new();
    resolver.add(remote);

    let handle = resolver.get("lab/camera").await.unwrap();
    assert_eq!(handle.address(), "IOR:cam");
    assert_eq!(handle.namespace(), Some("lab"));
    assert_eq!(handle.qualified_name(), "lab/camera");

    // unqualified names are looked up everywhere
    assert!(resolver.get("camera").await.is_ok());

    match resolver.get("garage/camera").await {
        Err(RegistryError::NotFound { consulted, .. }) => assert!(consulted.is_empty()),
        other => panic!("unexpected result {:?}", other),
    }

    assert_eq!(resolver.names().await, vec!["lab/camera"]);
}

#[tokio::test]
async fn test_ambiguous_announcement_falls_through() {
    let browser = Arc::new(MemoryBrowser::default());
    browser.announce("camera", "IOR:first");
    browser.announce("camera", "IOR:second");
    browser.announce("lidar", "IOR:lidar");
    browser.announce("lidar", "IOR:lidar");
    let discovery: Arc<dyn Registry> = Arc::new(DiscoveryRegistry::new(browser));

    let resolver = Resolver::new();
    resolver.add(discovery.clone());

    // duplicate announcements of one address are not ambiguous
    assert_eq!(resolver.get("lidar").await.unwrap().address(), "IOR:lidar");
    assert!(matches!(
        discovery.get("camera").await,
        Err(RegistryError::Ambiguous { count: 2, .. })
    ));
    assert!(matches!(
        resolver.get("camera").await,
        Err(RegistryError::NotFound { .. })
    ));

    resolver.add(local(&[("camera", "IOR:local")]));
    assert_eq!(resolver.get("camera").await.unwrap().address(), "IOR:local");
}

#[tokio::test]
async fn test_each_reachable_pings_resolved_handles() {
    let runtime = Arc::new(PingRuntime::answering(&["IOR:a", "IOR:remote-b"]));
    let client = Arc::new(MemoryDirectory::with(
        "corbaloc:host",
        &[("b", "IOR:remote-b"), ("c", "IOR:c")],
    ));

    let resolver = Resolver::new().with_runtime(runtime);
    resolver.add(local(&[("a", "IOR:a"), ("b", "IOR:stale-b")]));
    resolver.add(directory(&client));

    // "b" resolves to the stale local handle first
    assert_eq!(resolver.each_reachable().await, vec!["a"]);
}

#[tokio::test]
async fn test_each_reachable_without_runtime_asks_backends() {
    let client = Arc::new(MemoryDirectory::with("corbaloc:host", &[("b", "IOR:b")]));

    let resolver = Resolver::new();
    resolver.add(local(&[("a", "IOR:a")]));
    resolver.add(Arc::new(BrokenRegistry));
    resolver.add(directory(&client));

    assert_eq!(resolver.each_reachable().await, vec!["a", "b"]);
}
