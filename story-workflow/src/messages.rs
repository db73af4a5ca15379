//! Operator-facing texts.

pub const ASK_DATE: &str = "Alright, what date do you want the story for? 🐢📜 (dd.mm.yyyy)";
pub const RESET_STORY: &str = "Alright, I'll forget everything! 🐢🤔";
pub const STORY_GENERATION_IN_PROGRESS: &str = "Crafting a fresh tale just for you! 🐢📜 Hang tight!";
pub const IMAGE_PROMPT_GENERATION_IN_PROGRESS: &str =
    "Getting ready to craft a new visual masterpiece! 🐢🎨 Hold on to your shell!";
pub const IMAGE_GENERATION_IN_PROGRESS: &str =
    "Alright, diving deep into my turtle thoughts to conjure your tale... 🐢🤔✍️";
pub const SUGGEST_TARGET_TOPICS: &str = "Hmm, I can suggest some topics for the next story! 🐢📝";
pub const REMEMBER_INPUT_DATE: &str = "Alright, I'll remember this date! 🐢📆";
pub const REMEMBER_INPUT_STORY: &str = "Alright, I'll remember this story! 🐢📜";
pub const REMEMBER_INPUT_IMAGE_PROMPT: &str = "Alright, I'll remember this image prompt! 🐢🎨";
pub const REMEMBER_INPUT_IMAGE: &str = "Alright, I'll remember this image! 🐢🖼️";
pub const REMEMBER_TARGET_TOPIC: &str = "Alright, I'll use this topic in the next story! 🐢📝";
pub const SEND_SCHEDULE_STORY: &str = "Alright, I'll send this story to the channels! 🐢📲";
pub const START_REPLY: &str =
    "Hey there! 🐢👋 I'm a turtle bot! 🐢🤖 I can help you with some turtle stuff! 🐢📲";
pub const PONG_REPLY: &str = "Pong! 🐢🏓";
pub const NO_STATE: &str = "Sorry, I don't have any story state in memory! 🐢🤔";
pub const SET_COMMENT: &str = "Alright, I'll remember this generation comment! 🐢📝";
pub const CLEAR_COMMENT: &str = "Alright, I'll forget generation comment! 🐢🤔";
pub const DONE: &str = "Done!";

pub const ERR_NO_REPLY_DATE: &str = "Please, reply to the text message with the date! 🐢🤔";
pub const ERR_NO_REPLY_STORY: &str = "Please, reply to the text message with the story! 🐢🤔";
pub const ERR_NO_REPLY_IMAGE: &str = "Please, reply to the image message! 🐢🤔";
pub const ERR_NO_REPLY_STORY_TOPIC: &str =
    "Please, reply to the text message with the story topic! 🐢🤔";
pub const ERR_NO_REPLY_MSG: &str = "Please, reply to the text message with the message! 🐢🤔";
pub const ERR_INVALID_INPUT_DATE: &str = "Sorry, I don't understand this date! 🐢🤔";
pub const ERR_DATE_IN_THE_PAST: &str = "Sorry, I already prepared story for this date! 🐢🤔";
pub const ERR_INVALID_STORY: &str = "Sorry, I don't have story! 🐢🤔";
pub const ERR_NO_IMAGE_PROMPT: &str = "Sorry, I don't have image prompt! 🐢🤔";
pub const ERR_NO_TOPICS: &str = "Sorry, I don't have a topic for this story! 🐢🤔";
pub const ERR_NO_STORY_PHOTO: &str = "Sorry, I don't have photo for this story! 🐢🤔";
pub const ERR_INVALID_PHOTO: &str = "Sorry, I can't recognize story photo! 🐢🤔";
pub const ERR_NO_PREVIEW_DATA: &str = "Sorry, I don't have anything to preview! 🐢🤔";
pub const ERR_NO_DESTINATIONS: &str = "Sorry, I don't know where to send the story! 🐢🤔";
pub const ERR_GENERATION: &str = "Sorry, I'm having trouble generating this! 🐢🤔";
pub const ERR_IMAGE_GENERATION: &str = "Sorry, I'm having trouble generating your image! 🐢🤔";
pub const ERR_DELIVERY: &str = "Sorry, I couldn't deliver this message! 🐢🤔";
pub const ERR_STAGING: &str = "Sorry, I couldn't save this image! 🐢🤔";
pub const ERR_INVALID_ACTION: &str = "Sorry, this button doesn't work anymore! 🐢🤔";
pub const ERR_UNKNOWN_USER: &str = "Sorry, I don't know you! 🐢🤔";
pub const UNHANDLED_ERROR: &str = "Sorry, I'm having trouble handling your request! 🐢🤔";

/// Unhandled-error text with the error appended, as shown to operators.
pub fn unhandled_error(err: &str) -> String {
    format!("{UNHANDLED_ERROR}\n\n{err}")
}
