use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::manifest::{self, PlaylistSource};
use crate::registry::{ViewerGuard, ViewerRegistry};
use crate::segment::SegmentDownloader;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Playing,
    Stopped,
}

/// One simulated viewer: owns its stop token and the background task
/// driving the refresh/fetch/dwell loop.
///
/// `Stopped` is terminal. A stopped session is discarded, never restarted.
pub struct PlaybackSession {
    id: u64,
    token: CancellationToken,
    state: Arc<Mutex<SessionState>>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Resolves the lowest-bandwidth rendition for `endpoint` and spawns the
    /// playback loop. On resolution failure the session never registers with
    /// the viewer registry, so no compensating decrement is needed.
    pub async fn start(
        id: u64,
        endpoint: Url,
        playlists: Arc<dyn PlaylistSource>,
        segments: Arc<dyn SegmentDownloader>,
        registry: Arc<ViewerRegistry>,
        config: Arc<SessionConfig>,
        parent: &CancellationToken,
    ) -> Result<Self, SessionError> {
        let media_url = playlists.resolve_lowest_variant(&endpoint).await?;
        let base_url = manifest::base_url(&media_url)?;

        let token = parent.child_token();
        let state = Arc::new(Mutex::new(SessionState::Starting));

        // The increment happens before the loop is entered; the guard moves
        // into the task and its drop is the one decrement on every exit path.
        let guard = ViewerGuard::register(registry);
        *state.lock() = SessionState::Playing;

        let task_state = state.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            playback_loop(
                id, &media_url, &base_url, playlists, segments, config, task_token, guard,
            )
            .await;
            *task_state.lock() = SessionState::Stopped;
        });

        Ok(Self {
            id,
            token,
            state,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Requests cooperative termination. Idempotent; callable from any task.
    pub fn request_stop(&self) {
        self.token.cancel();
    }

    /// Waits for the session task to exit, up to `timeout`. Returns whether
    /// the task finished; it is never forcibly killed past the bound.
    pub async fn await_stopped(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return true;
        };
        match tokio::time::timeout(timeout, &mut *handle).await {
            Ok(result) => {
                self.handle = None;
                if let Err(e) = result {
                    warn!("session {} task failed: {e}", self.id);
                }
                true
            }
            Err(_) => {
                warn!("session {} did not stop within {timeout:?}", self.id);
                false
            }
        }
    }
}

/// The per-viewer loop: refresh the media playlist, fetch the first couple
/// of segments with a dwell after each, and repeat until the broadcast ends
/// or a stop is requested. Manifest failures and empty playlists are normal
/// end states, not errors.
#[allow(clippy::too_many_arguments)]
async fn playback_loop(
    id: u64,
    media_url: &Url,
    base_url: &Url,
    playlists: Arc<dyn PlaylistSource>,
    segments: Arc<dyn SegmentDownloader>,
    config: Arc<SessionConfig>,
    token: CancellationToken,
    guard: ViewerGuard,
) {
    let _guard = guard;

    while !token.is_cancelled() {
        let playlist = match playlists.fetch_media(media_url).await {
            Ok(playlist) => playlist,
            Err(e) => {
                info!("session {id}: media playlist unavailable, ending: {e}");
                break;
            }
        };
        if playlist.segments.is_empty() {
            info!("session {id}: playlist has no segments, ending");
            break;
        }

        for segment in playlist.segments.iter().take(config.segments_per_refresh) {
            // Stop requests are honored mid-batch, not only at loop bounds.
            if token.is_cancelled() {
                break;
            }
            match segments.fetch(&segment.uri, base_url).await {
                Ok(elapsed) => debug!(
                    "session {id}: segment {} in {:.2}s",
                    segment.uri,
                    elapsed.as_secs_f64()
                ),
                Err(e) => warn!("session {id}: segment fetch failed: {e}"),
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(config.segment_dwell) => {}
            }
        }

        if playlist.end_list {
            info!("session {id}: broadcast ended");
            break;
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(config.refresh_interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use m3u8_rs::{MediaPlaylist, MediaSegment};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn media_playlist(segment_count: usize, end_list: bool) -> MediaPlaylist {
        MediaPlaylist {
            segments: (0..segment_count)
                .map(|i| MediaSegment {
                    uri: format!("seg{i}.ts"),
                    duration: 2.0,
                    ..MediaSegment::empty()
                })
                .collect(),
            end_list,
            ..Default::default()
        }
    }

    /// Replays a scripted sequence of media playlist responses, then fails.
    struct ScriptedPlaylists {
        responses: Mutex<VecDeque<Result<MediaPlaylist, FetchError>>>,
    }

    impl ScriptedPlaylists {
        fn new(responses: Vec<Result<MediaPlaylist, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl PlaylistSource for ScriptedPlaylists {
        async fn resolve_lowest_variant(&self, url: &Url) -> Result<Url, FetchError> {
            Ok(url.clone())
        }

        async fn fetch_media(&self, _url: &Url) -> Result<MediaPlaylist, FetchError> {
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Playlist("script exhausted".into())))
        }
    }

    /// Always reports a live playlist, as a broadcast that never ends.
    struct EndlessPlaylists;

    #[async_trait]
    impl PlaylistSource for EndlessPlaylists {
        async fn resolve_lowest_variant(&self, url: &Url) -> Result<Url, FetchError> {
            Ok(url.clone())
        }

        async fn fetch_media(&self, _url: &Url) -> Result<MediaPlaylist, FetchError> {
            Ok(media_playlist(4, false))
        }
    }

    struct FailingResolution;

    #[async_trait]
    impl PlaylistSource for FailingResolution {
        async fn resolve_lowest_variant(&self, _url: &Url) -> Result<Url, FetchError> {
            Err(FetchError::Playlist("unreachable".into()))
        }

        async fn fetch_media(&self, _url: &Url) -> Result<MediaPlaylist, FetchError> {
            unreachable!("startup failed, loop must not run")
        }
    }

    struct CountingSegments {
        fetched: AtomicUsize,
    }

    impl CountingSegments {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fetched: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SegmentDownloader for CountingSegments {
        async fn fetch(&self, _uri: &str, _base: &Url) -> Result<Duration, FetchError> {
            self.fetched.fetch_add(1, Ordering::SeqCst);
            Ok(Duration::from_millis(10))
        }
    }

    fn endpoint() -> Url {
        Url::parse("https://cdn/x/live.m3u8").unwrap()
    }

    async fn start_session(
        playlists: Arc<dyn PlaylistSource>,
        segments: Arc<CountingSegments>,
        registry: Arc<ViewerRegistry>,
    ) -> Result<PlaybackSession, SessionError> {
        PlaybackSession::start(
            1,
            endpoint(),
            playlists,
            segments,
            registry,
            Arc::new(SessionConfig::default()),
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_endlist_terminates_after_single_dwell() {
        let playlists = ScriptedPlaylists::new(vec![Ok(media_playlist(1, true))]);
        let segments = CountingSegments::new();
        let registry = Arc::new(ViewerRegistry::new());

        let mut session = start_session(playlists, segments.clone(), registry.clone())
            .await
            .unwrap();
        assert_eq!(registry.count(), 1);
        assert_eq!(session.state(), SessionState::Playing);

        assert!(session.await_stopped(Duration::from_secs(120)).await);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(segments.fetched.load(Ordering::SeqCst), 1);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_segment_cap_per_refresh() {
        // Live playlist with 4 segments, then failure ends the loop: only
        // the first 2 segments of the one successful refresh are fetched.
        let playlists = ScriptedPlaylists::new(vec![Ok(media_playlist(4, false))]);
        let segments = CountingSegments::new();
        let registry = Arc::new(ViewerRegistry::new());

        let mut session = start_session(playlists, segments.clone(), registry.clone())
            .await
            .unwrap();
        assert!(session.await_stopped(Duration::from_secs(300)).await);
        assert_eq!(segments.fetched.load(Ordering::SeqCst), 2);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_request_ends_live_session() {
        let segments = CountingSegments::new();
        let registry = Arc::new(ViewerRegistry::new());

        let mut session = start_session(Arc::new(EndlessPlaylists), segments, registry.clone())
            .await
            .unwrap();
        assert_eq!(registry.count(), 1);

        session.request_stop();
        session.request_stop(); // idempotent
        assert!(session.await_stopped(Duration::from_secs(120)).await);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(registry.count(), 0);

        // Waiting again on a stopped session is a no-op.
        assert!(session.await_stopped(Duration::from_secs(1)).await);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_failure_mid_loop_decrements_once() {
        let playlists = ScriptedPlaylists::new(vec![
            Ok(media_playlist(2, false)),
            Err(FetchError::Playlist("gone".into())),
        ]);
        let segments = CountingSegments::new();
        let registry = Arc::new(ViewerRegistry::new());

        let mut session = start_session(playlists, segments, registry.clone())
            .await
            .unwrap();
        assert!(session.await_stopped(Duration::from_secs(300)).await);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_playlist_ends_session() {
        let playlists = ScriptedPlaylists::new(vec![Ok(media_playlist(0, false))]);
        let segments = CountingSegments::new();
        let registry = Arc::new(ViewerRegistry::new());

        let mut session = start_session(playlists, segments.clone(), registry.clone())
            .await
            .unwrap();
        assert!(session.await_stopped(Duration::from_secs(60)).await);
        assert_eq!(segments.fetched.load(Ordering::SeqCst), 0);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_failure_never_registers() {
        let segments = CountingSegments::new();
        let registry = Arc::new(ViewerRegistry::new());

        let result = start_session(Arc::new(FailingResolution), segments, registry.clone()).await;
        assert!(matches!(result, Err(SessionError::StartupFailed(_))));
        assert_eq!(registry.count(), 0);
    }
}
