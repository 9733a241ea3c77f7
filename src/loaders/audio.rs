use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

use super::{mismatched_source, DocumentLoader, LoadResult, Source};
use crate::config::AssemblyConfig;
use crate::LoaderError;

/// Audio transcription loader backed by the AssemblyAI API.
///
/// Thin delegation: upload the file, submit a transcription job, poll until
/// it settles, and hand back the transcript text with the job metadata.
#[derive(Debug)]
pub struct AudioLoader {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    audio_duration: Option<f64>,
    #[serde(default)]
    audio_url: Option<String>,
}

impl AudioLoader {
    /// Create a new loader.
    ///
    /// The credential comes from the explicit parameter or from configuration;
    /// with neither present construction fails before any load is attempted.
    pub fn new(api_key: Option<String>, config: &AssemblyConfig) -> Result<Self, LoaderError> {
        let api_key = api_key.or_else(|| config.api_key.clone()).ok_or_else(|| {
            LoaderError::DocumentLoader("Assembly AI API key not found".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    async fn transcribe(&self, path: &Path) -> crate::Result<LoadResult> {
        let upload_url = self.upload_file(path).await?;
        let job = self.submit_job(&upload_url).await?;
        let job = self.wait_for_job(&job.id).await?;

        let text = job
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .context("transcript was empty")?
            .to_string();

        let mut metadata = HashMap::new();
        metadata.insert("id".to_string(), json!(job.id));
        metadata.insert("status".to_string(), json!(job.status));
        if let Some(language_code) = &job.language_code {
            metadata.insert("language_code".to_string(), json!(language_code));
        }
        if let Some(audio_duration) = job.audio_duration {
            metadata.insert("audio_duration".to_string(), json!(audio_duration));
        }
        if let Some(audio_url) = &job.audio_url {
            metadata.insert("audio_url".to_string(), json!(audio_url));
        }
        metadata.insert(
            "completed_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );

        Ok(LoadResult::Audio { text, metadata })
    }

    /// Upload the local file and get back a service-side URL for it
    async fn upload_file(&self, path: &Path) -> crate::Result<String> {
        tracing::info!("Uploading audio file: {}", path.display());

        let content = fs_err::read(path)?;

        let response = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(content)
            .send()
            .await
            .context("Failed to upload audio file")?;

        if !response.status().is_success() {
            anyhow::bail!("audio upload failed: HTTP {}", response.status());
        }

        let upload: UploadResponse = response
            .json()
            .await
            .context("Failed to parse upload response")?;

        Ok(upload.upload_url)
    }

    /// Submit a transcription job for an uploaded file
    async fn submit_job(&self, audio_url: &str) -> crate::Result<TranscriptJob> {
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&json!({ "audio_url": audio_url }))
            .send()
            .await
            .context("Failed to submit transcription job")?;

        if !response.status().is_success() {
            anyhow::bail!("transcription request failed: HTTP {}", response.status());
        }

        let job: TranscriptJob = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        tracing::info!("Started transcription job: {}", job.id);
        Ok(job)
    }

    /// Poll the job until it completes or fails
    async fn wait_for_job(&self, job_id: &str) -> crate::Result<TranscriptJob> {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        progress.set_message("Transcribing audio...");

        let start_time = std::time::Instant::now();

        loop {
            let response = self
                .client
                .get(format!("{}/v2/transcript/{}", self.base_url, job_id))
                .header("authorization", &self.api_key)
                .send()
                .await
                .context("Failed to poll transcription job")?;

            if !response.status().is_success() {
                progress.finish_and_clear();
                anyhow::bail!("transcription poll failed: HTTP {}", response.status());
            }

            let job: TranscriptJob = response
                .json()
                .await
                .context("Failed to parse transcription response")?;

            match job.status.as_str() {
                "completed" => {
                    progress.finish_with_message("Transcription completed");
                    return Ok(job);
                }
                "error" => {
                    progress.finish_with_message("Transcription failed");
                    anyhow::bail!(
                        "transcription job failed: {}",
                        job.error.as_deref().unwrap_or("unknown error")
                    );
                }
                status => {
                    progress.set_message(format!(
                        "Transcribing... ({}, {}s elapsed)",
                        status,
                        start_time.elapsed().as_secs()
                    ));
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl DocumentLoader for AudioLoader {
    async fn load(&self, source: &Source) -> Result<LoadResult, LoaderError> {
        let path = match source {
            Source::Audio { path } => path,
            other => return Err(mismatched_source(self.name(), other)),
        };

        self.transcribe(path).await.map_err(|e| {
            LoaderError::DocumentLoader(format!("Error transcribing audio: {}", e))
        })
    }

    fn supports(&self, source: &Source) -> bool {
        matches!(source, Source::Audio { .. })
    }

    fn name(&self) -> &'static str {
        "AudioLoader"
    }
}
