//! Story config: who may operate the bot, where stories go, when they are sent and which
//! providers generate them.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use story_workflow::{PollPolicy, ScheduleTime, WorkflowConfig};

#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// TELEGRAM_ALLOWED_USERS
    pub allowed_users: Vec<i64>,
    /// CHAT_IDS_TO_SEND_STORIES
    pub destinations: Vec<i64>,
    /// USER_IDS_TO_SEND_MORNING_MSG
    pub morning_users: Vec<i64>,
    /// GENERATION_LANGUAGE
    pub language: String,
    /// DEFAULT_TZ, whole hours east of UTC
    pub utc_offset_hours: i32,
    pub schedule_hour: u32,
    pub schedule_minute: u32,
    pub schedule_second: u32,
    pub morning_hour: u32,
    pub morning_minute: u32,
    /// BASE_IMAGE_FOLDER
    pub image_dir: PathBuf,
    pub image_poll_max_attempts: u32,
    pub image_poll_delay_secs: u64,
    pub delivery_poll_interval_secs: u64,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    /// MODEL; the client default when unset
    pub model: Option<String>,
    /// IMAGE_MODEL; the provider default when unset
    pub image_model: Option<String>,
}

/// Parses a comma-separated id list, skipping blanks.
pub(crate) fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("invalid id in list: {}", s))
        })
        .collect()
}

fn id_list(name: &str) -> Result<Vec<i64>> {
    match env::var(name) {
        Ok(raw) => parse_id_list(&raw).with_context(|| format!("{} is malformed", name)),
        Err(_) => Ok(Vec::new()),
    }
}

fn number<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} is not a valid number: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl StoryConfig {
    pub fn from_env() -> Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;

        Ok(Self {
            allowed_users: id_list("TELEGRAM_ALLOWED_USERS")?,
            destinations: id_list("CHAT_IDS_TO_SEND_STORIES")?,
            morning_users: id_list("USER_IDS_TO_SEND_MORNING_MSG")?,
            language: env::var("GENERATION_LANGUAGE").unwrap_or_else(|_| "Russian".to_string()),
            utc_offset_hours: number("DEFAULT_TZ", 3)?,
            schedule_hour: number("DEFAULT_SCHEDULE_HOUR", 6)?,
            schedule_minute: number("DEFAULT_SCHEDULE_MINUTE", 4)?,
            schedule_second: number("DEFAULT_SCHEDULE_SECOND", 33)?,
            morning_hour: number("MORNING_HOUR", 8)?,
            morning_minute: number("MORNING_MINUTE", 0)?,
            image_dir: PathBuf::from(
                env::var("BASE_IMAGE_FOLDER").unwrap_or_else(|_| "./data/images".to_string()),
            ),
            image_poll_max_attempts: number("IMAGE_POLL_MAX_ATTEMPTS", 30)?,
            image_poll_delay_secs: number("IMAGE_POLL_DELAY_SECS", 10)?,
            delivery_poll_interval_secs: number("DELIVERY_POLL_INTERVAL_SECS", 30)?,
            openai_api_key,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            model: env::var("MODEL").ok(),
            image_model: env::var("IMAGE_MODEL").ok(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_users.is_empty() {
            anyhow::bail!("TELEGRAM_ALLOWED_USERS must list at least one user id");
        }
        if self.destinations.is_empty() {
            anyhow::bail!("CHAT_IDS_TO_SEND_STORIES must list at least one chat id");
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            anyhow::bail!("DEFAULT_TZ out of range: {}", self.utc_offset_hours);
        }
        if self.schedule_hour > 23 || self.schedule_minute > 59 || self.schedule_second > 59 {
            anyhow::bail!(
                "DEFAULT_SCHEDULE time out of range: {}:{}:{}",
                self.schedule_hour,
                self.schedule_minute,
                self.schedule_second
            );
        }
        if self.morning_hour > 23 || self.morning_minute > 59 {
            anyhow::bail!(
                "MORNING time out of range: {}:{}",
                self.morning_hour,
                self.morning_minute
            );
        }
        if self.image_poll_max_attempts == 0 {
            anyhow::bail!("IMAGE_POLL_MAX_ATTEMPTS must be at least 1");
        }
        if self.delivery_poll_interval_secs == 0 {
            anyhow::bail!("DELIVERY_POLL_INTERVAL_SECS must be at least 1");
        }
        if let Some(ref url_str) = self.openai_base_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!("OPENAI_BASE_URL is set but not a valid URL: {}", url_str);
            }
        }
        Ok(())
    }

    pub fn schedule_time(&self) -> ScheduleTime {
        ScheduleTime {
            hour: self.schedule_hour,
            minute: self.schedule_minute,
            second: self.schedule_second,
            utc_offset_hours: self.utc_offset_hours,
        }
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            language: self.language.clone(),
            destinations: self.destinations.clone(),
            schedule: self.schedule_time(),
            image_dir: self.image_dir.clone(),
            poll: PollPolicy {
                max_attempts: self.image_poll_max_attempts,
                delay: Duration::from_secs(self.image_poll_delay_secs),
            },
        }
    }
}
