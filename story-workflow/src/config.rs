//! Engine settings: generation language, broadcast destinations, send time-of-day, staging
//! directory and image polling budget.

use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

/// Time-of-day and fixed UTC offset applied to a story date to get its send timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub utc_offset_hours: i32,
}

impl ScheduleTime {
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
    }
}

impl Default for ScheduleTime {
    fn default() -> Self {
        Self {
            hour: 6,
            minute: 4,
            second: 33,
            utc_offset_hours: 3,
        }
    }
}

/// Bounded image polling: at most `max_attempts` status checks, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub language: String,
    /// Broadcast destinations; the first one is used to infer the next story date.
    pub destinations: Vec<i64>,
    pub schedule: ScheduleTime,
    pub image_dir: PathBuf,
    pub poll: PollPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            language: "Russian".to_string(),
            destinations: Vec::new(),
            schedule: ScheduleTime::default(),
            image_dir: PathBuf::from("./data/images"),
            poll: PollPolicy::default(),
        }
    }
}
