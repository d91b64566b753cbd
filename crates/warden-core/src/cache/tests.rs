//! Context manager tests

use super::*;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_get_set_tracks_hits() {
    let manager = ContextManager::in_memory(Duration::from_secs(60), 100);
    assert!(manager.get("k").await.is_none());
    assert!(!manager.last_cache_hit());

    assert!(manager.set("k", json!({"rows": [1, 2]})).await);
    assert_eq!(manager.get("k").await, Some(json!({"rows": [1, 2]})));
    assert!(manager.last_cache_hit());
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let manager = ContextManager::in_memory(Duration::from_secs(1), 100);
    assert!(manager.set("k", json!("v")).await);
    assert_eq!(manager.get("k").await, Some(json!("v")));

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(manager.get("k").await.is_none());
    assert!(!manager.last_cache_hit());
    assert_eq!(manager.get_size().await.entries, 0);
}

#[tokio::test]
async fn test_oversized_value_rejected_without_eviction() {
    let manager = ContextManager::in_memory(Duration::from_secs(60), 1);
    assert!(manager.set("small", json!("ok")).await);

    let big = json!("x".repeat(2048));
    assert!(!manager.set("big", big).await);
    assert!(manager.get("big").await.is_none());
    assert_eq!(manager.get("small").await, Some(json!("ok")));
}

#[tokio::test]
async fn test_clear_pattern_and_size() {
    let manager = ContextManager::in_memory(Duration::from_secs(60), 100);
    manager.set("sentry:1", json!(1)).await;
    manager.set("sentry:2", json!(2)).await;
    manager.set("github:1", json!(3)).await;

    let size = manager.get_size().await;
    assert_eq!(size.backend, CacheBackendKind::Memory);
    assert_eq!(size.entries, 3);
    assert_eq!(size.total_bytes, 3);
    assert_eq!(size.limit_kb, 100);

    assert_eq!(manager.clear(Some("sentry")).await, 2);
    assert_eq!(manager.export().await.len(), 1);
    assert_eq!(manager.clear(None).await, 1);
    assert!(manager.export().await.is_empty());
}

#[tokio::test]
async fn test_delete_and_export() {
    let manager = ContextManager::in_memory(Duration::from_secs(60), 100);
    manager.set("b", json!(2)).await;
    manager.set("a", json!(1)).await;

    let exported = manager.export().await;
    let keys: Vec<&String> = exported.keys().collect();
    assert_eq!(keys, vec!["a", "b"]);

    assert!(manager.delete("a").await);
    assert!(!manager.delete("a").await);
}

#[tokio::test]
async fn test_cleanup_expired_counts() {
    let manager = ContextManager::in_memory(Duration::from_millis(20), 100);
    manager.set("a", json!(1)).await;
    manager.set("b", json!(2)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(manager.cleanup_expired().await, 2);
}

#[tokio::test]
async fn test_disk_backend_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig {
        backend: CacheBackendKind::Disk,
        disk_dir: temp_dir.path().join("cache"),
        ..CacheConfig::default()
    };

    {
        let manager = ContextManager::new(&config, Duration::from_secs(60), 100).unwrap();
        assert!(manager.set(&cache_key("list_errors", &json!({})), json!([1])).await);
    }

    let manager = ContextManager::new(&config, Duration::from_secs(60), 100).unwrap();
    assert_eq!(manager.backend(), CacheBackendKind::Disk);
    let hit = manager.get(&cache_key("list_errors", &json!({}))).await;
    assert_eq!(hit, Some(json!([1])));
}
