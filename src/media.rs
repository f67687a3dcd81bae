use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::{Limits, ProxySettings};
use crate::error::Result;
use crate::fetch::{check_status, content_type_of, proxied_client, read_bounded};

const FALLBACK_MIME: &str = "video/mp4";

/// A downloaded video held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub source_url: Url,
}

#[derive(Clone)]
pub struct MediaDownloader {
    client: Client,
    max_bytes: u64,
}

impl MediaDownloader {
    pub fn new(proxy: &ProxySettings, limits: &Limits) -> Result<Self> {
        Ok(Self {
            client: proxied_client(proxy, limits.download_timeout)?,
            max_bytes: limits.max_video_bytes,
        })
    }

    pub async fn download(&self, url: &Url) -> Result<MediaPayload> {
        let response = self.client.get(url.as_str()).send().await?;
        check_status(response.status(), url)?;

        let mime_type = video_mime(&content_type_of(&response));
        let bytes = read_bounded(response, self.max_bytes).await?;

        debug!(url = %url, bytes = bytes.len(), mime_type = %mime_type, "video downloaded");

        Ok(MediaPayload {
            bytes,
            mime_type,
            source_url: url.clone(),
        })
    }
}

/// Video MIME type from a Content-Type header, parameters stripped.
fn video_mime(content_type: &str) -> String {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if mime.starts_with("video/") {
        mime
    } else {
        FALLBACK_MIME.to_string()
    }
}
