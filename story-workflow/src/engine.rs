//! Workflow engine: decodes an update, runs the matching step and applies its transition.
//!
//! Collaborators are called here; what to send and what to persist is decided in
//! [`crate::transitions`]. A transition's messages are delivered before the session change is
//! written, so a failed send leaves the session as it was.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, NaiveDate};
use image_generation_client::{fetch_artifact, ImageProvider};
use storage::{Session, SessionStore, Stage, StagedImage};
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};
use turtle_core::{MessageSnapshot, MessagingGateway, Reaction, SendOptions, TurtleError, Update};

use crate::action::Action;
use crate::clock::{Clock, SystemClock};
use crate::command::{OperatorCommand, Trigger};
use crate::config::WorkflowConfig;
use crate::content::ContentProvider;
use crate::date::{next_story_date, today};
use crate::error::WorkflowError;
use crate::messages;
use crate::polling::poll_image;
use crate::staging::{read_staged, ArtifactStager};
use crate::transitions::{self, BroadcastReport, Outbound, PostSource, SessionChange, Transition};

/// Result of dispatching one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The workflow acted on the update. Callbacks carry the acknowledgement text.
    Handled { ack: Option<String> },
    /// Not a workflow update (unknown command, stray text).
    Ignored,
}

/// One async lock per chat. Steps for the same chat run one at a time whichever path started
/// them (an inbound update or the morning trigger).
#[derive(Default)]
struct ChatLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl ChatLocks {
    async fn lock(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(chat_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

pub struct WorkflowEngine {
    sessions: Arc<dyn SessionStore>,
    content: Arc<dyn ContentProvider>,
    images: Arc<dyn ImageProvider>,
    gateway: Arc<dyn MessagingGateway>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
    stager: ArtifactStager,
    http: reqwest::Client,
    bot_username: String,
    shutdown: Option<watch::Receiver<bool>>,
    chat_locks: ChatLocks,
}

impl WorkflowEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        content: Arc<dyn ContentProvider>,
        images: Arc<dyn ImageProvider>,
        gateway: Arc<dyn MessagingGateway>,
        config: WorkflowConfig,
    ) -> Self {
        let stager = ArtifactStager::new(config.image_dir.clone());
        Self {
            sessions,
            content,
            images,
            gateway,
            clock: Arc::new(SystemClock),
            config,
            stager,
            http: reqwest::Client::new(),
            bot_username: String::new(),
            shutdown: None,
            chat_locks: ChatLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Username used to accept `/command@bot_username`.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = username.into();
        self
    }

    /// Image polling stops waiting once `true` is sent on this channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Runs the workflow for one update.
    ///
    /// Recoverable failures are reported to the chat and count as handled. Storage failures
    /// are returned for the dispatch boundary to report.
    #[instrument(skip(self, update), fields(chat_id = update.chat.id, user_id = update.user.id))]
    pub async fn dispatch(&self, update: &Update) -> Result<DispatchOutcome, TurtleError> {
        let chat_id = update.chat.id;
        let is_callback = update.callback_id().is_some();
        let _serial = self.chat_locks.lock(chat_id).await;

        let (label, result) = match Trigger::decode(update, &self.bot_username) {
            Ok(Trigger::Ignored) => return Ok(DispatchOutcome::Ignored),
            Ok(trigger) => {
                let label = trigger.label();
                debug!(trigger = %label, "Dispatching");
                match self.run(chat_id, trigger).await {
                    Ok(false) => return Ok(DispatchOutcome::Ignored),
                    Ok(true) => (label, Ok(())),
                    Err(e) => (label, Err(e)),
                }
            }
            Err(e) => ("action:undecodable".to_string(), Err(WorkflowError::from(e))),
        };

        let failure = self.settle(chat_id, &label, result).await?;
        let ack = is_callback.then(|| failure.unwrap_or_else(|| messages::DONE.to_string()));
        Ok(DispatchOutcome::Handled { ack })
    }

    /// Starts a run for `chat_id` without an inbound update (morning trigger).
    #[instrument(skip(self))]
    pub async fn start_run(&self, chat_id: i64, date: Option<&str>) -> Result<(), TurtleError> {
        let _serial = self.chat_locks.lock(chat_id).await;
        let result = self.begin_run(chat_id, date).await;
        self.settle(chat_id, "morning", result).await.map(|_| ())
    }

    /// Reports a recoverable failure to the chat and returns its text; passes the rest on.
    async fn settle(
        &self,
        chat_id: i64,
        label: &str,
        result: Result<(), WorkflowError>,
    ) -> Result<Option<String>, TurtleError> {
        match result {
            Ok(()) => Ok(None),
            Err(err) if err.is_recoverable() => {
                warn!(chat_id, trigger = label, error = %err, "Workflow step failed");
                let text = err.user_message();
                if let Err(e) = self
                    .gateway
                    .send_message(chat_id, &text, SendOptions::default())
                    .await
                {
                    warn!(chat_id, error = %e, "Could not report failure to chat");
                }
                Ok(Some(text))
            }
            Err(err) => {
                error!(chat_id, trigger = label, error = %err, "Workflow step failed");
                Err(err.into())
            }
        }
    }

    /// False when the trigger turned out not to concern the workflow.
    async fn run(&self, chat_id: i64, trigger: Trigger) -> Result<bool, WorkflowError> {
        match trigger {
            Trigger::Command {
                command,
                message,
                reply_to,
            } => self
                .run_command(chat_id, command, &message, reply_to.as_ref())
                .await
                .map(|_| true),
            Trigger::Action { action, message } => self
                .run_action(chat_id, action, message.as_ref())
                .await
                .map(|_| true),
            Trigger::Text { message, .. } => {
                let session = self.sessions.get(chat_id).await?;
                if session.stage != Stage::AwaitingDate {
                    return Ok(false);
                }
                self.begin_run(chat_id, message.non_empty_text()).await?;
                Ok(true)
            }
            Trigger::Ignored => Ok(false),
        }
    }

    async fn run_command(
        &self,
        chat_id: i64,
        command: OperatorCommand,
        message: &MessageSnapshot,
        reply_to: Option<&MessageSnapshot>,
    ) -> Result<(), WorkflowError> {
        match command {
            OperatorCommand::Start => self.apply(chat_id, transitions::reply(messages::START_REPLY)).await,
            OperatorCommand::Ping => self.apply(chat_id, transitions::reply(messages::PONG_REPLY)).await,
            OperatorCommand::Help => {
                self.apply(chat_id, transitions::reply(OperatorCommand::help()))
                    .await
            }
            OperatorCommand::Story(arg) => {
                let arg = arg.trim();
                self.begin_run(chat_id, (!arg.is_empty()).then_some(arg))
                    .await
            }
            OperatorCommand::Topics => self.list_topics(chat_id).await,
            OperatorCommand::DraftStory => self.generate_story(chat_id, None, None).await,
            OperatorCommand::DraftImagePrompt => self.generate_image_prompt(chat_id, None).await,
            OperatorCommand::DraftImage => self.generate_image(chat_id, None).await,
            OperatorCommand::Preview => self.preview(chat_id).await,
            OperatorCommand::Schedule(arg) if arg.trim().is_empty() => {
                self.schedule_run(chat_id, None).await
            }
            OperatorCommand::Schedule(arg) => {
                self.schedule_manual(chat_id, reply_to, arg.trim()).await
            }
            OperatorCommand::State => {
                let session = self.sessions.get(chat_id).await?;
                self.apply(chat_id, transitions::show_state(&session)).await
            }
            OperatorCommand::Cancel => {
                let session = self.sessions.get(chat_id).await?;
                self.apply(chat_id, transitions::cancel()).await?;
                info!(chat_id, stage = session.stage.as_str(), "Run cancelled");
                self.discard_image(session.image.as_ref()).await;
                Ok(())
            }
            OperatorCommand::Comment(arg) => {
                self.apply(chat_id, transitions::set_comment(&arg, reply_to)?)
                    .await
            }
            OperatorCommand::ClearComment => {
                self.apply(chat_id, transitions::clear_comment()).await
            }
            OperatorCommand::SetDate => {
                self.apply(chat_id, transitions::set_date(message, reply_to)?)
                    .await
            }
            OperatorCommand::SetStory => {
                self.apply(chat_id, transitions::set_story(message, reply_to)?)
                    .await
            }
            OperatorCommand::SetImagePrompt => {
                self.apply(chat_id, transitions::set_image_prompt(message, reply_to)?)
                    .await
            }
            OperatorCommand::SetTopic => {
                let session = self.sessions.get(chat_id).await?;
                self.apply(
                    chat_id,
                    transitions::set_topic(&session, message, reply_to)?,
                )
                .await
            }
            OperatorCommand::SetImage => {
                let file_id = transitions::reply_photo(reply_to)?;
                let session = self.sessions.get(chat_id).await?;
                let image = self.stage_attachment(chat_id, file_id).await?;
                let path = image.path.clone();
                self.apply_staged(
                    chat_id,
                    transitions::set_image(message, image),
                    &path,
                    session.image.as_ref(),
                )
                .await
            }
        }
    }

    async fn run_action(
        &self,
        chat_id: i64,
        action: Action,
        message: Option<&MessageSnapshot>,
    ) -> Result<(), WorkflowError> {
        let pressed = message.map(|m| m.id);
        match action {
            Action::SelectTopic(index) => {
                let session = self.sessions.get(chat_id).await?;
                let (transition, topic) = transitions::select_topic(&session, message, index)?;
                self.apply(chat_id, transition).await?;
                self.generate_story(chat_id, None, Some(&topic)).await
            }
            Action::RegenerateStory => self.generate_story(chat_id, pressed, None).await,
            Action::ApproveStory => {
                self.apply(chat_id, transitions::approve_story(message)?)
                    .await?;
                self.generate_image_prompt(chat_id, None).await
            }
            Action::RegenerateImagePrompt => self.generate_image_prompt(chat_id, pressed).await,
            Action::ApproveImagePrompt => {
                self.apply(chat_id, transitions::approve_image_prompt(message)?)
                    .await?;
                self.generate_image(chat_id, None).await
            }
            Action::RegenerateImage => self.generate_image(chat_id, pressed).await,
            Action::ApproveImage => {
                let (message_id, file_id) = transitions::approved_photo(message)?;
                let session = self.sessions.get(chat_id).await?;
                let image = self.stage_attachment(chat_id, file_id).await?;
                let path = image.path.clone();
                self.apply_staged(
                    chat_id,
                    transitions::approve_image(message_id, image),
                    &path,
                    session.image.as_ref(),
                )
                .await?;
                self.preview(chat_id).await
            }
            Action::Schedule => self.schedule_run(chat_id, message).await,
        }
    }

    // ---- steps ----

    /// BeginRun: validate or infer the date, then suggest topics for it.
    async fn begin_run(&self, chat_id: i64, input: Option<&str>) -> Result<(), WorkflowError> {
        let today = self.today();
        let date = match input {
            Some(text) => transitions::run_date(text, today)?,
            None => match self.infer_date(today).await {
                Some(date) => date,
                None => return self.apply(chat_id, transitions::ask_date()).await,
            },
        };
        info!(chat_id, date = %date, "Starting story run");

        let topics = self.suggest_topics(chat_id, date).await?;
        let previous = self.sessions.get(chat_id).await?;
        self.apply(chat_id, transitions::topics_suggested(date, &topics))
            .await?;
        self.discard_image(previous.image.as_ref()).await;
        Ok(())
    }

    /// Day after the first destination's latest scheduled post. None when there is no
    /// history or it cannot be read.
    async fn infer_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        let destination = *self.config.destinations.first()?;
        match self.gateway.last_scheduled_send_date(destination).await {
            Ok(last) => next_story_date(last, today),
            Err(e) => {
                warn!(destination, error = %e, "Could not read last scheduled post");
                None
            }
        }
    }

    async fn list_topics(&self, chat_id: i64) -> Result<(), WorkflowError> {
        let session = self.sessions.get(chat_id).await?;
        let date = transitions::session_date(&session)?;
        let topics = self.suggest_topics(chat_id, date).await?;
        self.apply(chat_id, transitions::topics_listed(&topics)).await
    }

    async fn suggest_topics(
        &self,
        chat_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<String>, WorkflowError> {
        self.notify(chat_id, messages::SUGGEST_TARGET_TOPICS).await?;
        let topics = self
            .content
            .suggest_topics(date, &self.config.language)
            .await
            .map_err(|e| WorkflowError::Provider(e.to_string()))?;
        if topics.is_empty() {
            return Err(WorkflowError::Provider("no topics suggested".to_string()));
        }
        Ok(topics)
    }

    /// GenerateStory. `reacted_to` is the message whose regenerate button was pressed,
    /// `selected` the topic just picked from the menu.
    #[instrument(skip(self))]
    async fn generate_story(
        &self,
        chat_id: i64,
        reacted_to: Option<i32>,
        selected: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let session = self.sessions.get(chat_id).await?;
        let (date, directive) = transitions::story_directive(&session, selected)?;

        self.notify(chat_id, messages::STORY_GENERATION_IN_PROGRESS)
            .await?;
        let story = self
            .content
            .draft_story(date, &directive, &self.config.language)
            .await
            .map_err(|e| WorkflowError::Provider(e.to_string()))?;

        self.apply(
            chat_id,
            transitions::story_drafted(story).react(reacted_to, Reaction::SaluteFace),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn generate_image_prompt(
        &self,
        chat_id: i64,
        reacted_to: Option<i32>,
    ) -> Result<(), WorkflowError> {
        let session = self.sessions.get(chat_id).await?;
        let story = transitions::image_prompt_source(&session)?;

        self.notify(chat_id, messages::IMAGE_PROMPT_GENERATION_IN_PROGRESS)
            .await?;
        let prompt = self
            .content
            .derive_image_prompt(story)
            .await
            .map_err(|e| WorkflowError::Provider(e.to_string()))?;

        self.apply(
            chat_id,
            transitions::image_prompt_drafted(prompt).react(reacted_to, Reaction::SaluteFace),
        )
        .await
    }

    /// GenerateImage: submit, poll within the configured budget, fetch, stage, render.
    #[instrument(skip(self))]
    async fn generate_image(
        &self,
        chat_id: i64,
        reacted_to: Option<i32>,
    ) -> Result<(), WorkflowError> {
        let session = self.sessions.get(chat_id).await?;
        let request = transitions::image_request(&session)?;

        self.notify(chat_id, messages::IMAGE_GENERATION_IN_PROGRESS)
            .await?;
        let job = self
            .images
            .submit(request)
            .await
            .map_err(|e| WorkflowError::ImageGeneration(Some(e.to_string())))?;
        debug!(chat_id, job_id = %job.id, "Image job submitted");

        let artifact = poll_image(
            self.images.as_ref(),
            &job,
            &self.config.poll,
            self.shutdown.clone(),
        )
        .await
        .map_err(|e| WorkflowError::ImageGeneration(e.reason()))?;
        let bytes = fetch_artifact(&self.http, &artifact)
            .await
            .map_err(|e| WorkflowError::ImageGeneration(Some(e.to_string())))?;

        let path = self
            .stager
            .stage(chat_id, &bytes)
            .await
            .map_err(|e| WorkflowError::Staging(e.to_string()))?;
        self.apply_staged(
            chat_id,
            transitions::image_drafted(path.clone(), bytes).react(reacted_to, Reaction::SaluteFace),
            &path,
            session.image.as_ref(),
        )
        .await
    }

    async fn preview(&self, chat_id: i64) -> Result<(), WorkflowError> {
        let session = self.sessions.get(chat_id).await?;
        let photo = self.load_image(session.image.as_ref()).await;
        self.apply(chat_id, transitions::preview(&session, photo, self.today())?)
            .await
    }

    /// ScheduleRun: fan out to every destination, then clear the session whatever the
    /// per-destination outcome.
    ///
    /// `previewed` is the preview whose button was pressed: its photo and caption are what
    /// gets posted. Without one (bare `/schedule`) the session image and story are used.
    #[instrument(skip(self, previewed))]
    async fn schedule_run(
        &self,
        chat_id: i64,
        previewed: Option<&MessageSnapshot>,
    ) -> Result<(), WorkflowError> {
        let session = self.sessions.get(chat_id).await?;
        let source = match previewed.and_then(|m| m.photo_file_id.as_deref().map(|f| (m, f))) {
            Some((message, file_id)) => {
                let photo = self
                    .gateway
                    .download_attachment(file_id)
                    .await
                    .map_err(WorkflowError::transport)?;
                PostSource::previewed(photo, message.caption.as_deref())
            }
            None => PostSource::staged(self.load_image(session.image.as_ref()).await),
        };
        let plan = transitions::schedule_plan(
            &session,
            source,
            self.today(),
            &self.config.schedule,
            &self.config.destinations,
        )?;

        let report = self.broadcast(&plan.photo, &plan.caption, plan.at).await;
        self.apply(chat_id, transitions::scheduled(&report)).await?;
        info!(
            chat_id,
            send_at = %plan.at,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Story scheduled"
        );
        self.discard_image(session.image.as_ref()).await;
        Ok(())
    }

    /// `/schedule <date>` in reply to a captioned photo. The session is not touched.
    async fn schedule_manual(
        &self,
        chat_id: i64,
        reply_to: Option<&MessageSnapshot>,
        date: &str,
    ) -> Result<(), WorkflowError> {
        let (file_id, caption, at) = transitions::manual_schedule(
            reply_to,
            date,
            self.today(),
            &self.config.schedule,
            &self.config.destinations,
        )?;
        let photo = self
            .gateway
            .download_attachment(&file_id)
            .await
            .map_err(WorkflowError::transport)?;

        let report = self.broadcast(&photo, &caption, at).await;
        self.apply(chat_id, transitions::manually_scheduled(&report))
            .await
    }

    /// Best effort: a failing destination does not stop the others.
    async fn broadcast(
        &self,
        photo: &[u8],
        caption: &str,
        at: DateTime<FixedOffset>,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for &destination in &self.config.destinations {
            match self
                .gateway
                .schedule_send(destination, photo, caption, at)
                .await
            {
                Ok(()) => report.delivered.push(destination),
                Err(e) => {
                    warn!(destination, error = %e, "Could not schedule story");
                    report.failed.push((destination, e.to_string()));
                }
            }
        }
        report
    }

    // ---- plumbing ----

    /// Downloads an attachment and stages it under the chat's directory.
    async fn stage_attachment(
        &self,
        chat_id: i64,
        file_id: String,
    ) -> Result<StagedImage, WorkflowError> {
        let bytes = self
            .gateway
            .download_attachment(&file_id)
            .await
            .map_err(WorkflowError::transport)?;
        let path = self
            .stager
            .stage(chat_id, &bytes)
            .await
            .map_err(|e| WorkflowError::Staging(e.to_string()))?;
        Ok(StagedImage {
            path,
            file_id: Some(file_id),
        })
    }

    /// Staged file content, falling back to the transport copy when the file is gone.
    async fn load_image(&self, image: Option<&StagedImage>) -> Option<Vec<u8>> {
        let image = image?;
        if let Some(bytes) = read_staged(&image.path).await {
            return Some(bytes);
        }
        let file_id = image.file_id.as_deref()?;
        match self.gateway.download_attachment(file_id).await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %image.path.display(), error = %e, "Staged image unavailable");
                None
            }
        }
    }

    /// Removes a staged file this engine owns.
    async fn discard_image(&self, image: Option<&StagedImage>) {
        if let Some(image) = image.filter(|i| i.path.starts_with(self.stager.base())) {
            self.stager.discard(&image.path).await;
        }
    }

    /// Applies a transition that references the freshly staged `path`. The new file is removed
    /// if the transition fails; the one it replaces is removed if it succeeds.
    async fn apply_staged(
        &self,
        chat_id: i64,
        transition: Transition,
        path: &Path,
        replaced: Option<&StagedImage>,
    ) -> Result<(), WorkflowError> {
        if let Err(e) = self.apply(chat_id, transition).await {
            self.stager.discard(path).await;
            return Err(e);
        }
        self.discard_image(replaced.filter(|old| old.path != path))
            .await;
        Ok(())
    }

    async fn apply(&self, chat_id: i64, transition: Transition) -> Result<(), WorkflowError> {
        let Transition { change, outbound } = transition;
        self.deliver(chat_id, outbound).await?;
        match change {
            SessionChange::Keep => {}
            SessionChange::Merge(patch) if patch.is_empty() => {}
            SessionChange::Merge(patch) => {
                let session: Session = self.sessions.merge(chat_id, patch).await?;
                debug!(chat_id, stage = session.stage.as_str(), "Session updated");
            }
            SessionChange::Clear => {
                self.sessions.clear(chat_id).await?;
                debug!(chat_id, "Session cleared");
            }
        }
        Ok(())
    }

    async fn deliver(&self, chat_id: i64, outbound: Vec<Outbound>) -> Result<(), WorkflowError> {
        for item in outbound {
            match item {
                Outbound::Text { text, options } => {
                    self.gateway
                        .send_message(chat_id, &text, options)
                        .await
                        .map_err(WorkflowError::transport)?;
                }
                Outbound::Photo { bytes, options } => {
                    self.gateway
                        .send_photo(chat_id, &bytes, options)
                        .await
                        .map_err(WorkflowError::transport)?;
                }
                Outbound::React {
                    message_id,
                    reaction,
                } => {
                    if let Err(e) = self
                        .gateway
                        .set_reaction(chat_id, message_id, reaction)
                        .await
                    {
                        warn!(chat_id, message_id, error = %e, "Could not set reaction");
                    }
                }
            }
        }
        Ok(())
    }

    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), WorkflowError> {
        self.deliver(chat_id, vec![Outbound::notice(text)]).await
    }

    fn today(&self) -> NaiveDate {
        today(self.clock.now(), &self.config.schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// **Test: A second lock on the same chat waits until the first guard is dropped**
    #[tokio::test]
    async fn test_chat_locks_serialize_per_chat() {
        let locks = ChatLocks::default();
        let guard = locks.lock(1).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.lock(1)).await;
        assert!(blocked.is_err(), "same chat must wait");

        let other = tokio::time::timeout(Duration::from_millis(20), locks.lock(2)).await;
        assert!(other.is_ok(), "other chats are independent");

        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(20), locks.lock(1)).await;
        assert!(again.is_ok());
    }
}
