use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extract::{build_prompt, page_content, preview, PageMetadata};
use crate::fetch::ProxyFetcher;
use crate::llm::{GeminiClient, SummaryInput};
use crate::media::{MediaDownloader, MediaPayload};

/// What happened to the post's video during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    NotFound,
    Attached { bytes: usize, mime_type: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub url: String,
    pub preview: String,
    pub metadata: PageMetadata,
    pub video_url: Option<String>,
    pub video: VideoOutcome,
    pub summary: String,
}

/// Fetch, extract, download and summarize, in that order, once per call.
pub struct Pipeline {
    fetcher: ProxyFetcher,
    downloader: MediaDownloader,
    summarizer: GeminiClient,
    language: String,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: ProxyFetcher::new(&config.proxy, &config.limits)?,
            downloader: MediaDownloader::new(&config.proxy, &config.limits)?,
            summarizer: GeminiClient::new(&config.gemini, &config.limits)?,
            language: config.gemini.language.clone(),
        })
    }

    pub async fn run(&self, raw_url: &str) -> Result<PipelineReport> {
        let url = parse_post_url(raw_url)?;
        let started = Instant::now();

        let fetched = self
            .fetcher
            .fetch(&url)
            .instrument(info_span!("fetch", url = %url))
            .await?;
        info!(status = fetched.status_code, content_type = %fetched.content_type, "page fetched");

        let content = page_content(&fetched);
        info!(
            chars = content.text.len(),
            meta_tags = content.metadata.len(),
            video = content.video_url.is_some(),
            "content extracted"
        );

        let (media, video) = match &content.video_url {
            None => (None, VideoOutcome::NotFound),
            Some(video_url) => self.download_video(video_url).await,
        };

        let prompt = build_prompt(
            url.as_str(),
            &content.metadata,
            &content.text,
            media.is_some(),
            &self.language,
        );
        let input = SummaryInput {
            prompt: &prompt,
            media: media.as_ref(),
        };
        let summary = self
            .summarizer
            .summarize(&input)
            .instrument(info_span!("summarize", with_video = media.is_some()))
            .await?;

        info!(elapsed = ?started.elapsed(), summary_chars = summary.len(), "pipeline finished");

        Ok(PipelineReport {
            url: url.to_string(),
            preview: preview(&content.text),
            metadata: content.metadata,
            video_url: content.video_url.map(|u| u.to_string()),
            video,
            summary,
        })
    }

    /// A failed download does not end the run; the summary falls back to text.
    async fn download_video(&self, video_url: &Url) -> (Option<MediaPayload>, VideoOutcome) {
        let result = self
            .downloader
            .download(video_url)
            .instrument(info_span!("download", url = %video_url))
            .await;

        match result {
            Ok(payload) => {
                let outcome = VideoOutcome::Attached {
                    bytes: payload.bytes.len(),
                    mime_type: payload.mime_type.clone(),
                };
                (Some(payload), outcome)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "video download failed, continuing with text only");
                (None, VideoOutcome::Skipped { reason: err.to_string() })
            }
        }
    }
}

/// Trims the submitted URL and checks that it is an absolute http(s) URL.
pub fn parse_post_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidInput("Please enter a URL.".to_string()));
    }

    let url = Url::parse(raw).map_err(|e| AppError::InvalidInput(format!("Invalid URL {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::InvalidInput(format!("Unsupported URL scheme: {}", other))),
    }
}
