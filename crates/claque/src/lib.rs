// Live-audience playback simulation: endpoint resolution, lowest-bandwidth
// variant selection, paced segment fetching and viewer accounting.
pub mod client;
pub mod config;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod segment;
pub mod session;

// Export common types for ease of use
pub use client::{ProxyConfig, create_client, default_client};
pub use config::SessionConfig;
pub use error::{FetchError, ResolveError, SessionError};
pub use manifest::{FetchedPlaylist, ManifestStore, PlaylistSource};
pub use orchestrator::{HttpSessionFactory, SessionFactory, SessionOrchestrator, SessionParts};
pub use registry::{ViewerGuard, ViewerRegistry};
pub use resolver::{EndpointResolver, Kick};
pub use segment::{SegmentDownloader, SegmentFetcher};
pub use session::{PlaybackSession, SessionState};
