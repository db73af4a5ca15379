mod scheduled_post;
mod session;

pub use scheduled_post::{PostStatus, ScheduledPost};
pub use session::{Session, SessionPatch, Stage, StagedImage};
