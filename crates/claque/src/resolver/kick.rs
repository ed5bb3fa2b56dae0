use std::sync::LazyLock;

use crate::error::ResolveError;
use crate::resolver::EndpointResolver;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap};
use tracing::{debug, info, warn};
use url::Url;

/// The playback URL is embedded in the channel page as an escaped JSON
/// string field, so the literal text is `playback_url\":\"https:...\"`.
static PLAYBACK_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"playback_url\\":\\"(https:[^"]+?)\\""#).unwrap());

/// Kick channel-page resolver.
///
/// Scrapes the broadcaster's public page for the embedded playback manifest
/// URL. The page format is upstream-controlled and unstable; everything
/// format-specific lives in [`extract_playback_url`].
pub struct Kick {
    client: Client,
    headers: HeaderMap,
}

impl Kick {
    const BASE_URL: &'static str = "https://kick.com";

    pub fn new(client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert(ACCEPT_LANGUAGE, "en-US,en;q=0.9".parse().unwrap());
        Self { client, headers }
    }
}

#[async_trait]
impl EndpointResolver for Kick {
    async fn resolve(&self, broadcaster: &str) -> Result<Url, ResolveError> {
        let page_url = format!("{}/{broadcaster}", Self::BASE_URL);
        debug!("looking up stream for @{broadcaster}");

        let response = self
            .client
            .get(&page_url)
            .headers(self.headers.clone())
            .send()
            .await?;
        if !response.status().is_success() {
            warn!("channel page for @{broadcaster} returned {}", response.status());
            return Err(ResolveError::Status(response.status()));
        }
        let body = response.text().await?;

        let url = extract_playback_url(&body)?;
        info!("stream url found for @{broadcaster}");
        Ok(url)
    }
}

/// Recovers a literal playback URL from a raw channel page body.
///
/// Doubled backslashes and escaped forward slashes are unescaped so the
/// result carries no escape residue.
pub fn extract_playback_url(body: &str) -> Result<Url, ResolveError> {
    let captures = PLAYBACK_URL_REGEX
        .captures(body)
        .ok_or(ResolveError::NotFound)?;
    let raw = captures.get(1).ok_or(ResolveError::NotFound)?.as_str();
    let literal = raw.replace("\\\\", "\\").replace("\\/", "/");
    Url::parse(&literal).map_err(|_| ResolveError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_playback_url() {
        let body = r#"{"livestream\":{\"playback_url\":\"https:\/\/fa7.playback.live-video.net\/api\/video\/v1\/channel.m3u8?token=abc\",\"viewers\":12}"#;
        let url = extract_playback_url(body).unwrap();
        assert_eq!(
            url.as_str(),
            "https://fa7.playback.live-video.net/api/video/v1/channel.m3u8?token=abc"
        );
    }

    #[test]
    fn test_extract_playback_url_no_escaped_slashes() {
        let body = r#"playback_url\":\"https://cdn.example.com/live/master.m3u8\","#;
        let url = extract_playback_url(body).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/live/master.m3u8");
    }

    #[test]
    fn test_extract_playback_url_absent() {
        let body = "<html><body>offline channel</body></html>";
        assert!(matches!(
            extract_playback_url(body),
            Err(ResolveError::NotFound)
        ));
    }
}
