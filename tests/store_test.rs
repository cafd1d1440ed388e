//! Failure store lifecycle across independent instances
//!
//! The store has no in-memory state, so a record saved by one process must
//! be fully usable by another. These tests always read back through a fresh
//! instance.

use tempfile::TempDir;

use songchul::models::{ContentType, PublishRequest};
use songchul::store::{DurableFailureStore, RetryScope};

fn request(dir: &std::path::Path, name: &str, content_type: ContentType) -> PublishRequest {
    let media = dir.join(name);
    std::fs::write(&media, b"media").unwrap();
    let mut request = PublishRequest::new(&format!("실패 영상 {name}"), media, content_type);
    request.source_url = Some(format!("https://news.example.com/{name}"));
    request
}

#[test]
fn test_record_saved_by_one_instance_is_retryable_by_another() {
    let work = TempDir::new().unwrap();
    let root = work.path().join("failed");

    {
        let store = DurableFailureStore::new(&root);
        assert!(store.save(
            &request(work.path(), "clip.mp4", ContentType::Shorts),
            "step timeout at publish"
        ));
    }

    // The original media file disappearing must not matter: the store holds
    // its own copy
    std::fs::remove_file(work.path().join("clip.mp4")).unwrap();

    let store = DurableFailureStore::new(&root);
    let pending = store.list(RetryScope::All);
    assert_eq!(pending.len(), 1);

    let stored = &pending[0];
    let rebuilt = stored.record.to_request(&store.type_dir(stored.content_type));
    assert!(rebuilt.media_path.exists());
    assert_eq!(rebuilt.title, "실패 영상 clip.mp4");
    assert_eq!(
        rebuilt.source_url.as_deref(),
        Some("https://news.example.com/clip.mp4")
    );

    assert!(store.delete(stored.content_type, &stored.base_name));
    assert_eq!(DurableFailureStore::new(&root).statistics().total(), 0);
}

#[test]
fn test_statistics_count_per_content_type_directory() {
    let work = TempDir::new().unwrap();
    let root = work.path().join("failed");

    {
        let store = DurableFailureStore::new(&root);
        assert!(store.save(&request(work.path(), "a.mp4", ContentType::Shorts), "r1"));
        assert!(store.save(&request(work.path(), "b.mp4", ContentType::Shorts), "r2"));
        assert!(store.save(&request(work.path(), "c.mp4", ContentType::Longform), "r3"));
    }

    let stats = DurableFailureStore::new(&root).statistics();
    assert_eq!(stats.shorts, 2);
    assert_eq!(stats.longform, 1);
    assert_eq!(stats.total(), 3);
}

#[test]
fn test_concurrent_saves_never_collide_on_base_names() {
    let work = TempDir::new().unwrap();
    let store = DurableFailureStore::new(work.path().join("failed"));
    let request = request(work.path(), "same.mp4", ContentType::Shorts);

    // Same wall-clock second: only the random suffix separates them
    for _ in 0..5 {
        assert!(store.save(&request, "repeat"));
    }
    assert_eq!(store.list(RetryScope::All).len(), 5);
}
