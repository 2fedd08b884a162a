use async_trait::async_trait;
use log::{info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::PipelineError;
use crate::source::SourceKind;
use crate::{Document, web, youtube};

/// Turns a classified URL into documents.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, url: &Url, kind: SourceKind) -> Result<Vec<Document>, PipelineError>;
}

/// Loader that talks to YouTube and to arbitrary web servers
pub struct HttpLoader {
    page_client: reqwest::Client,
    video_client: reqwest::Client,
    youtube_base_url: String,
    lang: String,
    max_page_bytes: usize,
}

impl HttpLoader {
    pub fn new(fetch: &FetchConfig) -> Result<Self, PipelineError> {
        let page_client = web::build_client(fetch).map_err(|e| PipelineError::invalid(format!("http client: {e}")))?;
        let video_client = reqwest::Client::builder()
            .connect_timeout(fetch.connect_timeout)
            .timeout(fetch.timeout)
            .build()
            .map_err(|e| PipelineError::invalid(format!("http client: {e}")))?;
        Ok(Self {
            page_client,
            video_client,
            youtube_base_url: fetch.youtube_base_url.trim_end_matches('/').to_string(),
            lang: fetch.lang.clone(),
            max_page_bytes: fetch.max_bytes,
        })
    }

    async fn load_video(&self, url: &Url) -> Result<Vec<Document>, PipelineError> {
        let video_id = crate::extract_video_id(url.as_str())
            .ok_or_else(|| PipelineError::unavailable(SourceKind::Video, format!("no video ID in {url}")))?;

        let transcript = youtube::fetch_captions(&self.video_client, &self.youtube_base_url, &video_id, &self.lang)
            .await
            .map_err(|e| {
                warn!("Transcript fetch failed for {video_id}: {e}");
                PipelineError::unavailable(SourceKind::Video, e.to_string())
            })?;

        info!(
            "Loaded transcript for {} ({}, {} segments)",
            transcript.video_id,
            transcript.language,
            transcript.segments.len()
        );
        Ok(vec![transcript.into_document(url.as_str())])
    }

    async fn load_page(&self, url: &Url) -> Result<Vec<Document>, PipelineError> {
        let doc = web::fetch_page(&self.page_client, url, self.max_page_bytes).await.map_err(|e| {
            warn!("Page fetch failed for {url}: {e}");
            PipelineError::unavailable(SourceKind::GenericPage, e.to_string())
        })?;
        info!("Loaded page {url} ({} chars)", doc.text.chars().count());
        Ok(vec![doc])
    }
}

#[async_trait]
impl ContentLoader for HttpLoader {
    async fn load(&self, url: &Url, kind: SourceKind) -> Result<Vec<Document>, PipelineError> {
        match kind {
            SourceKind::Video => self.load_video(url).await,
            SourceKind::GenericPage => self.load_page(url).await,
        }
    }
}
