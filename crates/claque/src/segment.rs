use crate::error::FetchError;
use crate::manifest::resolve_url;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

#[async_trait]
pub trait SegmentDownloader: Send + Sync {
    /// Resolves `segment_uri` against `base_url` and performs a partial
    /// fetch, returning the elapsed wall-clock time.
    async fn fetch(&self, segment_uri: &str, base_url: &Url) -> Result<Duration, FetchError>;
}

/// Fetches media segments the way a player warming its buffer would, but
/// reads only the first body chunk: enough to register the request with the
/// origin without downloading full media.
pub struct SegmentFetcher {
    client: Client,
    timeout: Duration,
}

impl SegmentFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl SegmentDownloader for SegmentFetcher {
    async fn fetch(&self, segment_uri: &str, base_url: &Url) -> Result<Duration, FetchError> {
        let segment_url = resolve_url(base_url, segment_uri)?;

        let start = Instant::now();
        let mut response = self
            .client
            .get(segment_url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        // First chunk only; dropping the response releases the connection.
        let _ = response.chunk().await?;
        let elapsed = start.elapsed();

        debug!("segment loaded in {:.2}s: {segment_url}", elapsed.as_secs_f64());
        Ok(elapsed)
    }
}
