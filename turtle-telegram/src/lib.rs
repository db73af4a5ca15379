//! # turtle-telegram
//!
//! Telegram transport layer: adapters to core updates, [`TelegramGateway`] implementing
//! [`turtle_core::MessagingGateway`], the dispatcher runner and the scheduled post delivery loop.
//! No workflow logic lives here.

mod adapters;
mod delivery;
mod gateway;
mod runner;

pub use adapters::{snapshot, TelegramCallbackWrapper, TelegramMessageWrapper, TelegramUserWrapper};
pub use delivery::{DeliveryStats, DeliveryWorker};
pub use gateway::{inline_keyboard, truncate_chars, TelegramGateway, MAX_CALLBACK_TEXT};
pub use runner::{run_dispatcher, UpdateProcessor};

use tracing::error;

/// Creates a teloxide Bot, pointing it at `api_url` when one is given and valid.
pub fn build_bot(token: &str, api_url: Option<&str>) -> teloxide::Bot {
    let bot = teloxide::Bot::new(token);
    match api_url {
        Some(url_str) => match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        },
        None => bot,
    }
}
