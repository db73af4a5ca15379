//! Bounded polling of an image generation job.

use image_generation_client::{ImageArtifact, ImageJob, ImageProvider, ImageStatus};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::PollPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("image job failed: {}", .0.as_deref().unwrap_or("no details"))]
    Failed(Option<String>),
    #[error("image job not finished after {attempts} attempts (last progress {last_progress}%)")]
    Exhausted { attempts: u32, last_progress: u8 },
    #[error("image polling cancelled")]
    Cancelled,
    #[error("image status request failed: {0}")]
    Provider(String),
}

impl PollError {
    /// Human-readable reason for the operator, when there is one.
    pub fn reason(&self) -> Option<String> {
        match self {
            PollError::Failed(reason) => reason.clone(),
            other => Some(other.to_string()),
        }
    }
}

/// Checks the job up to `policy.max_attempts` times, sleeping `policy.delay` between checks.
/// A `true` on `shutdown` aborts the wait.
pub async fn poll_image(
    provider: &dyn ImageProvider,
    job: &ImageJob,
    policy: &PollPolicy,
    mut shutdown: Option<watch::Receiver<bool>>,
) -> Result<ImageArtifact, PollError> {
    let mut last_progress = 0;
    for attempt in 1..=policy.max_attempts {
        match provider
            .status(job)
            .await
            .map_err(|e| PollError::Provider(e.to_string()))?
        {
            ImageStatus::Completed(artifact) => return Ok(artifact),
            ImageStatus::Failed { reason } => {
                warn!(job_id = %job.id, attempt, reason = ?reason, "Image job failed");
                return Err(PollError::Failed(reason));
            }
            ImageStatus::InProgress { progress } => {
                last_progress = progress;
                debug!(job_id = %job.id, attempt, progress, "Image job in progress");
            }
        }

        if attempt == policy.max_attempts {
            break;
        }
        match shutdown.as_mut() {
            Some(rx) => {
                if *rx.borrow() {
                    return Err(PollError::Cancelled);
                }
                tokio::select! {
                    _ = tokio::time::sleep(policy.delay) => {}
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            return Err(PollError::Cancelled);
                        }
                    }
                }
            }
            None => tokio::time::sleep(policy.delay).await,
        }
    }

    warn!(job_id = %job.id, attempts = policy.max_attempts, last_progress, "Image polling exhausted");
    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
        last_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedImages {
        statuses: Mutex<Vec<ImageStatus>>,
        calls: Mutex<u32>,
    }

    impl ScriptedImages {
        fn new(mut statuses: Vec<ImageStatus>) -> Self {
            statuses.reverse();
            Self {
                statuses: Mutex::new(statuses),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageProvider for ScriptedImages {
        async fn submit(&self, _request: image_generation_client::ImageRequest) -> anyhow::Result<ImageJob> {
            Ok(ImageJob { id: "job".into() })
        }

        async fn status(&self, _job: &ImageJob) -> anyhow::Result<ImageStatus> {
            *self.calls.lock().unwrap() += 1;
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(ImageStatus::InProgress { progress: 10 }))
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    fn job() -> ImageJob {
        ImageJob { id: "job".into() }
    }

    #[tokio::test]
    async fn test_completes_after_progress() {
        let images = ScriptedImages::new(vec![
            ImageStatus::InProgress { progress: 10 },
            ImageStatus::InProgress { progress: 60 },
            ImageStatus::Completed(ImageArtifact::Bytes(vec![1])),
        ]);
        let artifact = poll_image(&images, &job(), &policy(5), None).await.unwrap();
        assert_eq!(artifact, ImageArtifact::Bytes(vec![1]));
        assert_eq!(*images.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempt_budget() {
        let images = ScriptedImages::new(vec![
            ImageStatus::InProgress { progress: 10 },
            ImageStatus::InProgress { progress: 10 },
            ImageStatus::InProgress { progress: 10 },
        ]);
        let err = poll_image(&images, &job(), &policy(3), None).await.unwrap_err();
        assert_eq!(
            err,
            PollError::Exhausted {
                attempts: 3,
                last_progress: 10
            }
        );
        assert_eq!(*images.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failure_reason_is_kept() {
        let images = ScriptedImages::new(vec![ImageStatus::Failed {
            reason: Some("banned prompt".into()),
        }]);
        let err = poll_image(&images, &job(), &policy(3), None).await.unwrap_err();
        assert_eq!(err.reason().as_deref(), Some("banned prompt"));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_wait() {
        let images = ScriptedImages::new(vec![]);
        let (tx, rx) = watch::channel(false);
        let slow = PollPolicy {
            max_attempts: 10,
            delay: Duration::from_secs(60),
        };
        let handle = tokio::spawn(async move { poll_image(&images, &job(), &slow, Some(rx)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(PollError::Cancelled));
    }
}
