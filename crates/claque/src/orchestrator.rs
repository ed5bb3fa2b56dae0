use crate::client::{self, ProxyConfig};
use crate::config::SessionConfig;
use crate::error::ResolveError;
use crate::manifest::{ManifestStore, PlaylistSource};
use crate::registry::ViewerRegistry;
use crate::resolver::{EndpointResolver, Kick};
use crate::segment::{SegmentDownloader, SegmentFetcher};
use crate::session::PlaybackSession;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The collaborators backing one viewer session.
pub struct SessionParts {
    pub resolver: Arc<dyn EndpointResolver>,
    pub playlists: Arc<dyn PlaylistSource>,
    pub segments: Arc<dyn SegmentDownloader>,
}

/// Builds the per-viewer collaborators. The production factory creates a
/// dedicated HTTP client per viewer; tests inject in-memory parts.
pub trait SessionFactory: Send + Sync {
    fn session_parts(&self, proxy: Option<&ProxyConfig>) -> Result<SessionParts, ResolveError>;
}

/// One HTTP client per viewer, so cookies and proxy assignment stay
/// isolated between sessions.
pub struct HttpSessionFactory {
    config: Arc<SessionConfig>,
}

impl HttpSessionFactory {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self { config }
    }
}

impl SessionFactory for HttpSessionFactory {
    fn session_parts(&self, proxy: Option<&ProxyConfig>) -> Result<SessionParts, ResolveError> {
        let http_client = client::create_client(proxy)?;
        Ok(SessionParts {
            resolver: Arc::new(Kick::new(http_client.clone())),
            playlists: Arc::new(ManifestStore::new(http_client.clone())),
            segments: Arc::new(SegmentFetcher::new(http_client, self.config.segment_timeout)),
        })
    }
}

/// Launches and tracks playback sessions, sharing one viewer registry and
/// propagating the shutdown token it was given to every session.
pub struct SessionOrchestrator {
    factory: Arc<dyn SessionFactory>,
    config: Arc<SessionConfig>,
    registry: Arc<ViewerRegistry>,
    shutdown: CancellationToken,
    sessions: Vec<PlaybackSession>,
    next_id: u64,
}

impl SessionOrchestrator {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: Arc<SessionConfig>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            factory,
            config,
            registry: Arc::new(ViewerRegistry::new()),
            shutdown,
            sessions: Vec::new(),
            next_id: 0,
        }
    }

    /// Starts `count` viewers for `broadcaster`, each with its own endpoint
    /// resolution. Resolutions run one at a time to avoid tripping upstream
    /// anti-automation defenses; the playback loops themselves run
    /// unbounded. A viewer that fails to start is logged and skipped, never
    /// aborting the rest of the batch. Returns how many sessions started.
    pub async fn launch(
        &mut self,
        broadcaster: &str,
        count: usize,
        proxy: Option<&ProxyConfig>,
    ) -> usize {
        let mut started = 0;
        for _ in 0..count {
            if self.shutdown.is_cancelled() {
                break;
            }
            let id = self.next_id;
            self.next_id += 1;

            let parts = match self.factory.session_parts(proxy) {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("viewer {id} not started: {e}");
                    continue;
                }
            };
            let endpoint = match parts.resolver.resolve(broadcaster).await {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    warn!("viewer {id} not started: {e}");
                    continue;
                }
            };
            match PlaybackSession::start(
                id,
                endpoint,
                parts.playlists,
                parts.segments,
                self.registry.clone(),
                self.config.clone(),
                &self.shutdown,
            )
            .await
            {
                Ok(session) => {
                    self.sessions.push(session);
                    started += 1;
                }
                Err(e) => warn!("viewer {id} not started: {e}"),
            }
        }
        info!("launched {started} viewer(s) for @{broadcaster}");
        started
    }

    /// Requests termination of every tracked session, waits out the stop
    /// timeout for each and discards them. Safe to call repeatedly and on a
    /// partially-launched set.
    pub async fn stop_all(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        info!("stopping {} session(s)", self.sessions.len());
        for session in &self.sessions {
            session.request_stop();
        }
        for mut session in self.sessions.drain(..) {
            session.await_stopped(self.config.stop_timeout).await;
        }
    }

    /// Cancels the orchestrator-level token: ends the process monitor loop
    /// and, through the child tokens, winds the sessions down.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of viewers currently inside their playback loop.
    pub fn viewer_count(&self) -> u64 {
        self.registry.count()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> &[PlaybackSession] {
        &self.sessions
    }
}
