//! Hand-written collaborators and update builders shared by the workflow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result as AnyResult};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use image_generation_client::{ImageArtifact, ImageJob, ImageProvider, ImageRequest, ImageStatus};
use storage::{InMemorySessionStore, Session, SessionStore};
use story_workflow::{
    ContentProvider, FixedClock, PollPolicy, ScheduleTime, StoryDirective, WorkflowConfig,
    WorkflowEngine,
};
use tempfile::TempDir;
use turtle_core::{
    Chat, MessageSnapshot, MessagingGateway, PhotoOptions, Reaction, Result, SendOptions,
    SentMessage, TurtleError, Update, UpdateKind, User,
};

pub const CHAT_ID: i64 = 42;
pub const OPERATOR_ID: i64 = 7;
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

/// Everything the fake transport was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: i64,
        message_id: i32,
        text: String,
        options: SendOptions,
    },
    Photo {
        chat_id: i64,
        message_id: i32,
        file_id: String,
        options: PhotoOptions,
    },
    Reaction {
        chat_id: i64,
        message_id: i32,
        reaction: Reaction,
    },
    Scheduled {
        destination: i64,
        photo: Vec<u8>,
        caption: String,
        at: DateTime<FixedOffset>,
    },
}

#[derive(Default)]
pub struct MockGateway {
    pub sent: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    files: Mutex<HashMap<String, Vec<u8>>>,
    pub last_scheduled: Mutex<Option<DateTime<FixedOffset>>>,
    pub failing_destinations: Mutex<Vec<i64>>,
    pub fail_sends: AtomicBool,
    pub fail_photos: AtomicBool,
    pub schedule_attempts: Mutex<Vec<i64>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(100),
            ..Self::default()
        }
    }

    /// Makes `file_id` downloadable.
    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Id and text of the last text message.
    pub fn last_text(&self) -> (i32, String) {
        self.sent()
            .into_iter()
            .rev()
            .find_map(|s| match s {
                Sent::Text {
                    message_id, text, ..
                } => Some((message_id, text)),
                _ => None,
            })
            .expect("no text sent")
    }

    /// Id, file id and options of the last photo.
    pub fn last_photo(&self) -> (i32, String, PhotoOptions) {
        self.sent()
            .into_iter()
            .rev()
            .find_map(|s| match s {
                Sent::Photo {
                    message_id,
                    file_id,
                    options,
                    ..
                } => Some((message_id, file_id, options)),
                _ => None,
            })
            .expect("no photo sent")
    }

    pub fn reactions(&self) -> Vec<(i32, Reaction)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reaction {
                    message_id,
                    reaction,
                    ..
                } => Some((message_id, reaction)),
                _ => None,
            })
            .collect()
    }

    pub fn scheduled(&self) -> Vec<(i64, String, DateTime<FixedOffset>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Scheduled {
                    destination,
                    caption,
                    at,
                    ..
                } => Some((destination, caption, at)),
                _ => None,
            })
            .collect()
    }

    /// Destination and photo content of every scheduled post.
    pub fn scheduled_photos(&self) -> Vec<(i64, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Scheduled {
                    destination, photo, ..
                } => Some((destination, photo)),
                _ => None,
            })
            .collect()
    }

    fn check_send(&self) -> Result<i32> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TurtleError::Transport("network is down".to_string()));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> Result<SentMessage> {
        let message_id = self.check_send()?;
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            message_id,
            text: text.to_string(),
            options,
        });
        Ok(SentMessage {
            message_id,
            photo_file_id: None,
        })
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &[u8],
        options: PhotoOptions,
    ) -> Result<SentMessage> {
        if self.fail_photos.load(Ordering::SeqCst) {
            return Err(TurtleError::Transport("photo rejected".to_string()));
        }
        let message_id = self.check_send()?;
        let file_id = format!("photo-{}", message_id);
        self.add_file(&file_id, photo);
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            message_id,
            file_id: file_id.clone(),
            options,
        });
        Ok(SentMessage {
            message_id,
            photo_file_id: Some(file_id),
        })
    }

    async fn set_reaction(&self, chat_id: i64, message_id: i32, reaction: Reaction) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Reaction {
            chat_id,
            message_id,
            reaction,
        });
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn download_attachment(&self, file_id: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| TurtleError::Transport(format!("file {} not found", file_id)))
    }

    async fn last_scheduled_send_date(
        &self,
        _destination: i64,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(*self.last_scheduled.lock().unwrap())
    }

    async fn schedule_send(
        &self,
        destination: i64,
        photo: &[u8],
        caption: &str,
        at: DateTime<FixedOffset>,
    ) -> Result<()> {
        self.schedule_attempts.lock().unwrap().push(destination);
        if self.failing_destinations.lock().unwrap().contains(&destination) {
            return Err(TurtleError::Transport("chat not found".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Scheduled {
            destination,
            photo: photo.to_vec(),
            caption: caption.to_string(),
            at,
        });
        Ok(())
    }
}

/// Numbered, deterministic text generation.
#[derive(Default)]
pub struct MockContent {
    pub topic_calls: AtomicUsize,
    pub story_calls: AtomicUsize,
    pub prompt_calls: AtomicUsize,
    pub directives: Mutex<Vec<StoryDirective>>,
    pub fail: AtomicBool,
}

impl MockContent {
    pub fn calls(&self) -> usize {
        self.topic_calls.load(Ordering::SeqCst)
            + self.story_calls.load(Ordering::SeqCst)
            + self.prompt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for MockContent {
    async fn suggest_topics(&self, _date: NaiveDate, _language: &str) -> AnyResult<Vec<String>> {
        self.topic_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("quota exceeded");
        }
        Ok((1..=5).map(|i| format!("19{}0 - Event {}", i, i)).collect())
    }

    async fn draft_story(
        &self,
        _date: NaiveDate,
        directive: &StoryDirective,
        _language: &str,
    ) -> AnyResult<String> {
        let n = self.story_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            bail!("quota exceeded");
        }
        self.directives.lock().unwrap().push(directive.clone());
        Ok(format!("Story #{}", n))
    }

    async fn derive_image_prompt(&self, _story: &str) -> AnyResult<String> {
        let n = self.prompt_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            bail!("quota exceeded");
        }
        Ok(format!("Prompt #{}", n))
    }
}

/// Completes every job on the first status check unless told to stall.
#[derive(Default)]
pub struct MockImages {
    pub requests: Mutex<Vec<ImageRequest>>,
    pub status_calls: AtomicUsize,
    pub stall: AtomicBool,
}

#[async_trait]
impl ImageProvider for MockImages {
    async fn submit(&self, request: ImageRequest) -> AnyResult<ImageJob> {
        self.requests.lock().unwrap().push(request);
        Ok(ImageJob {
            id: "job-1".to_string(),
        })
    }

    async fn status(&self, _job: &ImageJob) -> AnyResult<ImageStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            return Ok(ImageStatus::InProgress { progress: 10 });
        }
        Ok(ImageStatus::Completed(ImageArtifact::Bytes(PNG.to_vec())))
    }
}

pub struct Harness {
    pub engine: WorkflowEngine,
    pub gateway: Arc<MockGateway>,
    pub content: Arc<MockContent>,
    pub images: Arc<MockImages>,
    pub sessions: Arc<InMemorySessionStore>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(destinations: Vec<i64>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        let content = Arc::new(MockContent::default());
        let images = Arc::new(MockImages::default());
        let sessions = Arc::new(InMemorySessionStore::new());
        let config = WorkflowConfig {
            language: "English".to_string(),
            destinations,
            schedule: ScheduleTime::default(),
            image_dir: dir.path().join("images"),
            poll: PollPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(1),
            },
        };
        let engine = WorkflowEngine::new(
            sessions.clone(),
            content.clone(),
            images.clone(),
            gateway.clone(),
            config,
        )
        .with_clock(Arc::new(FixedClock(now())))
        .with_bot_username("turtle_bot");
        Self {
            engine,
            gateway,
            content,
            images,
            sessions,
            dir,
        }
    }

    pub async fn session(&self) -> Session {
        self.sessions.get(CHAT_ID).await.unwrap()
    }

    /// Staged files currently under the chat's image directory.
    pub fn staged_files(&self) -> Vec<std::path::PathBuf> {
        let dir = self.dir.path().join("images").join(CHAT_ID.to_string());
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Writes a staged image file and returns its path.
    pub fn staged_file(&self) -> std::path::PathBuf {
        let path = self.dir.path().join("images").join("seed.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, PNG).unwrap();
        path
    }
}

/// 30.04.2026 12:00 UTC, 15:00 in the default +3 offset.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 30, 12, 0, 0).unwrap()
}

fn update(kind: UpdateKind) -> Update {
    Update {
        user: User {
            id: OPERATOR_ID,
            username: Some("operator".to_string()),
            first_name: Some("Op".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: CHAT_ID,
            chat_type: "private".to_string(),
        },
        kind,
        received_at: now(),
    }
}

pub fn text(text: &str) -> Update {
    update(UpdateKind::Message {
        message: MessageSnapshot::text(1, text),
        reply_to: None,
    })
}

pub fn reply(text: &str, reply_to: MessageSnapshot) -> Update {
    update(UpdateKind::Message {
        message: MessageSnapshot::text(2, text),
        reply_to: Some(reply_to),
    })
}

pub fn click(data: String, message: Option<MessageSnapshot>) -> Update {
    update(UpdateKind::Callback {
        callback_id: "cb-1".to_string(),
        data,
        message,
    })
}
