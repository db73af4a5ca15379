//! Bot configuration: BaseConfig (Telegram + log + DB) + StoryConfig (operators, destinations,
//! schedule, providers).

mod base;
mod bot_config;
mod story;


pub use base::BaseConfig;
pub use bot_config::BotConfig;
pub use story::StoryConfig;
