//! Wiring tests: components come up against a fresh database file without touching the network.

use std::path::PathBuf;

use storage::{SessionPatch, SessionStore};
use tokio::sync::watch;
use turtle_bot::{build_bot_components, build_engine, BaseConfig, BotConfig, StoryConfig};

fn config(database_url: String) -> BotConfig {
    BotConfig {
        base: BaseConfig {
            bot_token: "123:abc".to_string(),
            telegram_api_url: None,
            log_file: "logs/test.log".to_string(),
            database_url,
        },
        story: StoryConfig {
            allowed_users: vec![7],
            destinations: vec![-1001, -1002],
            morning_users: vec![7],
            language: "English".to_string(),
            utc_offset_hours: 3,
            schedule_hour: 6,
            schedule_minute: 4,
            schedule_second: 33,
            morning_hour: 8,
            morning_minute: 0,
            image_dir: PathBuf::from("./data/images"),
            image_poll_max_attempts: 30,
            image_poll_delay_secs: 10,
            delivery_poll_interval_secs: 30,
            openai_api_key: "sk-test".to_string(),
            openai_base_url: None,
            model: None,
            image_model: Some("dall-e-2".to_string()),
        },
    }
}

/// **Test: Components share one database and the engine gets the story settings**
#[tokio::test]
async fn test_build_components() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("turtle.db");
    let config = config(db.to_string_lossy().to_string());
    assert!(config.validate().is_ok());

    let components = build_bot_components(&config).await.unwrap();
    components
        .sessions
        .merge(42, SessionPatch::new().date("01.05.2026"))
        .await
        .unwrap();
    assert_eq!(
        components.sessions.get(42).await.unwrap().date.as_deref(),
        Some("01.05.2026")
    );
    assert!(components.posts.last_send_at(-1001).await.unwrap().is_none());

    let (_tx, rx) = watch::channel(false);
    let engine = build_engine(&config, &components, "turtle_bot", rx);
    assert_eq!(engine.config().destinations, vec![-1001, -1002]);
    assert_eq!(engine.config().language, "English");
}
