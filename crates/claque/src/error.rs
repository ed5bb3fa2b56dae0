use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while resolving a broadcaster to a playback manifest URL.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("playback url not found")]
    NotFound,
    #[error("client setup failed: {0}")]
    ClientSetup(String),
}

/// Errors raised while fetching playlists or segments.
///
/// Transport and parse failures are collapsed here on purpose: callers treat
/// both as "abort this attempt" and only need the message for logging.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("playlist error: {0}")]
    Playlist(String),
    #[error("no resolvable variant")]
    NoVariant,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("startup failed: {0}")]
    StartupFailed(#[from] FetchError),
}
