//! Integration tests for [`storage::SqliteSessionStore`] and [`storage::InMemorySessionStore`].
//!
//! Uses an in-memory SQLite database and a temp-file database for persistence across reopen.

use std::path::PathBuf;

use storage::{
    InMemorySessionStore, SessionPatch, SessionStore, SqliteSessionStore, Stage, StagedImage,
};

/// **Test: Get on an unknown chat returns an empty session.**
#[tokio::test]
async fn test_get_absent_session_is_empty() {
    let store = SqliteSessionStore::new("sqlite::memory:")
        .await
        .expect("Failed to create store");

    let session = store.get(42).await.expect("Failed to get session");
    assert!(session.is_empty());
    assert_eq!(session.stage, Stage::Idle);
}

/// **Test: Merge writes only the fields present in the patch.**
///
/// **Setup:** Merge date and topics, then merge story.
/// **Expected:** Date and topics survive the second merge; story is set.
#[tokio::test]
async fn test_merge_preserves_other_fields() {
    let store = SqliteSessionStore::new("sqlite::memory:")
        .await
        .expect("Failed to create store");

    store
        .merge(
            1,
            SessionPatch::new()
                .date("01.05.2099")
                .target_topics(vec!["Moon landing".to_string()])
                .stage(Stage::TopicsSuggested),
        )
        .await
        .unwrap();
    store
        .merge(1, SessionPatch::new().story("A story").stage(Stage::StoryDrafted))
        .await
        .unwrap();

    let session = store.get(1).await.unwrap();
    assert_eq!(session.date.as_deref(), Some("01.05.2099"));
    assert_eq!(session.target_topics, vec!["Moon landing".to_string()]);
    assert_eq!(session.story.as_deref(), Some("A story"));
    assert_eq!(session.stage, Stage::StoryDrafted);
}

/// **Test: Sessions are isolated per chat and clear removes only one chat.**
#[tokio::test]
async fn test_clear_is_per_chat() {
    let store = SqliteSessionStore::new("sqlite::memory:")
        .await
        .expect("Failed to create store");

    store.merge(1, SessionPatch::new().story("one")).await.unwrap();
    store.merge(2, SessionPatch::new().story("two")).await.unwrap();

    store.clear(1).await.unwrap();
    store.clear(1).await.unwrap();

    assert!(store.get(1).await.unwrap().is_empty());
    assert_eq!(store.get(2).await.unwrap().story.as_deref(), Some("two"));
}

/// **Test: Sessions survive reopening the database file.**
#[tokio::test]
async fn test_session_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");
    let url = db_path.to_str().unwrap();

    {
        let store = SqliteSessionStore::new(url).await.unwrap();
        store
            .merge(
                7,
                SessionPatch::new().image(StagedImage {
                    path: PathBuf::from("/tmp/7/img.png"),
                    file_id: Some("file-1".to_string()),
                }),
            )
            .await
            .unwrap();
    }

    let store = SqliteSessionStore::new(url).await.unwrap();
    let session = store.get(7).await.unwrap();
    let image = session.image.expect("image should be stored");
    assert_eq!(image.file_id.as_deref(), Some("file-1"));
    assert_eq!(image.path, PathBuf::from("/tmp/7/img.png"));
}

/// **Test: In-memory store follows the same merge/clear semantics.**
#[tokio::test]
async fn test_in_memory_store_merge_and_clear() {
    let store = InMemorySessionStore::new();

    let merged = store
        .merge(5, SessionPatch::new().comment(Some("focus on science".into())))
        .await
        .unwrap();
    assert_eq!(merged.comment.as_deref(), Some("focus on science"));

    store.merge(5, SessionPatch::new().date("02.02.2099")).await.unwrap();
    let session = store.get(5).await.unwrap();
    assert_eq!(session.comment.as_deref(), Some("focus on science"));
    assert_eq!(session.date.as_deref(), Some("02.02.2099"));

    store.clear(5).await.unwrap();
    assert!(store.get(5).await.unwrap().is_empty());
}
