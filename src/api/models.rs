use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::PageMetadata;
use crate::pipeline::{PipelineReport, VideoOutcome};

/// Body of both the HTML form and the JSON endpoint.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub url: String,
    #[serde(rename = "summary_markdown")]
    pub summary: String,
    pub preview: String,
    pub metadata: PageMetadata,
    pub video_url: Option<String>,
    pub video: VideoOutcome,
    pub summarized_at: DateTime<Utc>,
    pub word_count: usize,
}

impl From<PipelineReport> for SummarizeResponse {
    fn from(report: PipelineReport) -> Self {
        SummarizeResponse {
            word_count: report.summary.split_whitespace().count(),
            url: report.url,
            summary: report.summary,
            preview: report.preview,
            metadata: report.metadata,
            video_url: report.video_url,
            video: report.video,
            summarized_at: Utc::now(),
        }
    }
}
