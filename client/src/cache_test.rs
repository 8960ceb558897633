use super::*;

fn msg(name: &str, ts: i64) -> ChatMessage {
    ChatMessage { name: name.into(), message: "hi".into(), timestamp: ts, client_id: "c".into() }
}

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("chat-client-{label}-{}", uuid::Uuid::new_v4()))
        .join("cache.json")
}

#[test]
fn memory_cache_clones_share_slot() {
    let cache = MemoryCache::new();
    let mut writer = cache.clone();

    writer.store(&[msg("a", 1)]).expect("store");

    assert_eq!(cache.load().expect("load"), vec![msg("a", 1)]);
}

#[test]
fn file_cache_missing_file_is_empty() {
    let cache = FileCache::new(temp_path("missing"));
    assert!(cache.load().expect("load").is_empty());
}

#[test]
fn file_cache_persists_across_instances() {
    let path = temp_path("persist");
    let mut first = FileCache::new(&path);
    first.store(&[msg("a", 1), msg("b", 2)]).expect("store");

    let second = FileCache::new(&path);

    assert_eq!(second.load().expect("load"), vec![msg("a", 1), msg("b", 2)]);
    let _ = std::fs::remove_dir_all(path.parent().expect("parent"));
}

#[test]
fn file_cache_reports_corrupt_contents() {
    let path = temp_path("corrupt");
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, b"not json").expect("write");

    let err = FileCache::new(&path).load().expect_err("corrupt cache should fail");

    assert_eq!(err.error_code(), "E_CACHE_CORRUPT");
    let _ = std::fs::remove_dir_all(path.parent().expect("parent"));
}
