use super::*;

#[tokio::test]
async fn test_file_store_missing_key_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::with_path(dir.path());

    assert!(store.get("nothing-here").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_store_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::with_path(dir.path().join("nested"));

    store.set("quota", r#"{"a":1}"#).await.unwrap();
    assert_eq!(store.get("quota").await.unwrap().as_deref(), Some(r#"{"a":1}"#));

    // Overwrite replaces the whole value
    store.set("quota", "{}").await.unwrap();
    assert_eq!(store.get("quota").await.unwrap().as_deref(), Some("{}"));
}

#[tokio::test]
async fn test_file_store_survives_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    FileStore::with_path(dir.path())
        .set("k", "persisted")
        .await
        .unwrap();

    let reopened = FileStore::with_path(dir.path());
    assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("persisted"));
}

#[test]
fn test_file_store_path_sanitizes_key() {
    let store = FileStore::with_path("/tmp/data");
    let path = store.path_for("rostrum/quota state");
    assert_eq!(path, PathBuf::from("/tmp/data/rostrum_quota_state.json"));
}

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryStore::with_entry("a", "1");
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

    store.set("b", "2").await.unwrap();
    assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    assert!(store.get("c").await.unwrap().is_none());
}
