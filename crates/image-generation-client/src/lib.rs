//! Image generation client.
//!
//! [`ImageProvider`] models generation as a job: `submit` returns immediately with an id and
//! `status` reports progress until the image is ready or the job failed. [`OpenAIImageProvider`]
//! runs the OpenAI images API call on a background task and keeps job results in memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize},
    Client,
};
use async_trait::async_trait;
use base64::Engine;
use openai_client::{build_config, mask_token};
use tracing::{info, warn};

/// What to draw: an illustration prompt, plus the story it illustrates for providers that use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub story: Option<String>,
}

impl ImageRequest {
    /// The prompt, or the story when the prompt is blank.
    pub fn effective_prompt(&self) -> Option<&str> {
        Some(self.prompt.trim())
            .filter(|p| !p.is_empty())
            .or_else(|| self.story.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    }
}

/// Handle of a submitted generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageJob {
    pub id: String,
}

/// Generated image: either a URL to fetch or the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageArtifact {
    Url(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    /// Progress in percent, 0..=100.
    InProgress { progress: u8 },
    Completed(ImageArtifact),
    Failed { reason: Option<String> },
}

impl ImageStatus {
    /// Completed or failed; no further change will happen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImageStatus::InProgress { .. })
    }
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn submit(&self, request: ImageRequest) -> Result<ImageJob>;
    async fn status(&self, job: &ImageJob) -> Result<ImageStatus>;
}

/// Resolves an artifact to image bytes, downloading URLs with `http`.
pub async fn fetch_artifact(http: &reqwest::Client, artifact: &ImageArtifact) -> Result<Vec<u8>> {
    match artifact {
        ImageArtifact::Bytes(bytes) => Ok(bytes.clone()),
        ImageArtifact::Url(url) => {
            let response = http.get(url).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
    }
}

fn image_model(name: &str) -> ImageModel {
    match name {
        "dall-e-2" => ImageModel::DallE2,
        "dall-e-3" => ImageModel::DallE3,
        other => ImageModel::Other(other.to_string()),
    }
}

fn artifact_from(image: &Image) -> Result<ImageArtifact> {
    match image {
        Image::Url { url, .. } => Ok(ImageArtifact::Url(url.clone())),
        Image::B64Json { b64_json, .. } => Ok(ImageArtifact::Bytes(
            base64::engine::general_purpose::STANDARD.decode(b64_json.as_bytes())?,
        )),
    }
}

/// Status of each job and when it last changed.
type JobTable = Arc<Mutex<HashMap<String, (ImageStatus, Instant)>>>;

/// Finished jobs nobody asked about are dropped after this long.
const UNCLAIMED_JOB_TTL: Duration = Duration::from_secs(60 * 60);

/// OpenAI images API behind the job interface.
#[derive(Clone)]
pub struct OpenAIImageProvider {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    size: ImageSize,
    api_key_for_logging: Option<String>,
    jobs: JobTable,
}

impl OpenAIImageProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Arc::new(Client::with_config(build_config(api_key.clone(), base_url))),
            model: "dall-e-3".to_string(),
            size: ImageSize::S1024x1024,
            api_key_for_logging: Some(api_key),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sets the model (dall-e-2, dall-e-3 or any compatible model name).
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    fn record(jobs: &JobTable, id: &str, status: ImageStatus) {
        if let Ok(mut table) = jobs.lock() {
            table.insert(id.to_string(), (status, Instant::now()));
        }
    }

    /// Drops finished jobs whose caller stopped polling (e.g. it ran out of attempts).
    fn prune(jobs: &JobTable, ttl: Duration) {
        if let Ok(mut table) = jobs.lock() {
            table.retain(|_, (status, at)| !status.is_terminal() || at.elapsed() < ttl);
        }
    }

    #[cfg(test)]
    fn tracked_jobs(&self) -> usize {
        self.jobs.lock().map(|t| t.len()).unwrap_or_default()
    }

    async fn generate(
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        size: ImageSize,
        prompt: String,
    ) -> Result<ImageArtifact> {
        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(image_model(&model))
            .size(size)
            .response_format(ImageResponseFormat::Url)
            .n(1)
            .build()?;

        if let Ok(json) = serde_json::to_string_pretty(&request) {
            tracing::debug!(request_json = %json, "OpenAI image generation request JSON");
        }

        let response = client.images().create(request).await?;
        match response.data.first() {
            Some(image) => artifact_from(image.as_ref()),
            None => anyhow::bail!("No image in response"),
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAIImageProvider {
    #[tracing::instrument(skip(self, request))]
    async fn submit(&self, request: ImageRequest) -> Result<ImageJob> {
        let prompt = match request.effective_prompt() {
            Some(prompt) => prompt.to_string(),
            None => anyhow::bail!("empty image prompt"),
        };
        let job = ImageJob {
            id: uuid::Uuid::new_v4().to_string(),
        };
        let masked = self
            .api_key_for_logging
            .as_deref()
            .map(mask_token)
            .unwrap_or_else(|| "***".to_string());
        info!(
            job_id = %job.id,
            model = %self.model,
            prompt_preview = %prompt.chars().take(100).collect::<String>(),
            api_key = %masked,
            "OpenAI image generation submitted"
        );

        Self::prune(&self.jobs, UNCLAIMED_JOB_TTL);
        Self::record(&self.jobs, &job.id, ImageStatus::InProgress { progress: 0 });

        let jobs = self.jobs.clone();
        let job_id = job.id.clone();
        let client = self.client.clone();
        let model = self.model.clone();
        let size = self.size;
        tokio::spawn(async move {
            let status = match Self::generate(client, model, size, prompt).await {
                Ok(artifact) => {
                    info!(job_id = %job_id, "OpenAI image generation completed");
                    ImageStatus::Completed(artifact)
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "OpenAI image generation failed");
                    ImageStatus::Failed {
                        reason: Some(e.to_string()),
                    }
                }
            };
            Self::record(&jobs, &job_id, status);
        });

        Ok(job)
    }

    /// A finished job is reported once and then forgotten.
    async fn status(&self, job: &ImageJob) -> Result<ImageStatus> {
        let mut table = self
            .jobs
            .lock()
            .map_err(|_| anyhow::anyhow!("image job table poisoned"))?;
        let status = match table.get(&job.id) {
            Some((status, _)) => status.clone(),
            None => {
                return Ok(ImageStatus::Failed {
                    reason: Some(format!("unknown job {}", job.id)),
                })
            }
        };
        if status.is_terminal() {
            table.remove(&job.id);
        }
        Ok(status)
    }
}
