//! BotConfig: BaseConfig + StoryConfig. Use load() for env-based loading.

use anyhow::Result;
use chrono::FixedOffset;

use super::{BaseConfig, StoryConfig};

pub struct BotConfig {
    pub base: BaseConfig,
    pub story: StoryConfig,
}

impl BotConfig {
    /// Load full config from environment variables. If `token` is provided it overrides BOT_TOKEN.
    /// Call validate() after load to check config before init.
    pub fn load(token: Option<String>) -> Result<Self> {
        let base = BaseConfig::load(token)?;
        let story = StoryConfig::from_env()?;
        Ok(Self { base, story })
    }

    /// Validate config. Call after load() to fail fast before init.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.story.validate()
    }

    pub fn bot_token(&self) -> &str {
        &self.base.bot_token
    }
    pub fn database_url(&self) -> &str {
        &self.base.database_url
    }
    pub fn log_file(&self) -> &str {
        &self.base.log_file
    }
    pub fn telegram_api_url(&self) -> Option<&str> {
        self.base.telegram_api_url.as_deref()
    }

    /// Offset of schedule timestamps and of the morning trigger.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.story
            .schedule_time()
            .offset()
            .ok_or_else(|| anyhow::anyhow!("DEFAULT_TZ out of range: {}", self.story.utc_offset_hours))
    }
}
