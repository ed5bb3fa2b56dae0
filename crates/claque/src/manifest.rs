use crate::error::FetchError;
use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist, parse_playlist_res};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Result of fetching a playback endpoint: platforms serve either a master
/// playlist listing bitrate variants or, for single-rendition broadcasts,
/// a directly playable media playlist.
#[derive(Debug)]
pub enum FetchedPlaylist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

/// Playlist access as seen by a playback session. Implemented over HTTP by
/// [`ManifestStore`]; tests substitute in-memory sources.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Resolves the endpoint URL down to the lowest-bandwidth media
    /// playlist URL.
    async fn resolve_lowest_variant(&self, url: &Url) -> Result<Url, FetchError>;

    /// Fetches the current media playlist. Every call produces a fresh
    /// value; nothing is cached between refreshes.
    async fn fetch_media(&self, url: &Url) -> Result<MediaPlaylist, FetchError>;
}

pub struct ManifestStore {
    client: Client,
}

impl ManifestStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn fetch_master(&self, url: &Url) -> Result<FetchedPlaylist, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        match parse_playlist_res(&bytes) {
            Ok(Playlist::MasterPlaylist(pl)) => Ok(FetchedPlaylist::Master(pl)),
            Ok(Playlist::MediaPlaylist(pl)) => Ok(FetchedPlaylist::Media(pl)),
            Err(e) => Err(FetchError::Playlist(format!(
                "failed to parse playlist {url}: {e}"
            ))),
        }
    }

    /// Picks the variant with the strictly minimum bandwidth; the first one
    /// seen wins ties. A master with no variants is already playable, so its
    /// own URL is returned unchanged.
    pub fn select_lowest_bandwidth(
        url: &Url,
        playlist: &FetchedPlaylist,
    ) -> Result<Url, FetchError> {
        let master = match playlist {
            FetchedPlaylist::Master(pl) if !pl.variants.is_empty() => pl,
            _ => return Ok(url.clone()),
        };

        let mut lowest = &master.variants[0];
        for variant in &master.variants[1..] {
            if variant.bandwidth < lowest.bandwidth {
                lowest = variant;
            }
        }

        debug!(
            "selected lowest bandwidth variant: {} ({} bps)",
            lowest.uri, lowest.bandwidth
        );
        resolve_url(url, &lowest.uri).map_err(|_| FetchError::NoVariant)
    }
}

#[async_trait]
impl PlaylistSource for ManifestStore {
    async fn resolve_lowest_variant(&self, url: &Url) -> Result<Url, FetchError> {
        let playlist = self.fetch_master(url).await?;
        Self::select_lowest_bandwidth(url, &playlist)
    }

    async fn fetch_media(&self, url: &Url) -> Result<MediaPlaylist, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        match parse_playlist_res(&bytes) {
            Ok(Playlist::MediaPlaylist(pl)) => Ok(pl),
            Ok(Playlist::MasterPlaylist(_)) => Err(FetchError::Playlist(format!(
                "expected media playlist, got master for {url}"
            ))),
            Err(e) => Err(FetchError::Playlist(format!(
                "failed to parse media playlist {url}: {e}"
            ))),
        }
    }
}

/// Joins a possibly relative URI against the directory of a manifest URL.
/// Scheme-qualified URIs pass through unchanged.
pub fn resolve_url(base: &Url, uri: &str) -> Result<Url, FetchError> {
    base.join(uri)
        .map_err(|e| FetchError::InvalidUrl(format!("could not join '{uri}' with {base}: {e}")))
}

/// Derives the directory base of a manifest URL, used to resolve the
/// relative segment URIs it references.
pub fn base_url(manifest_url: &Url) -> Result<Url, FetchError> {
    manifest_url
        .join(".")
        .map_err(|e| FetchError::InvalidUrl(format!("no base for {manifest_url}: {e}")))
}
