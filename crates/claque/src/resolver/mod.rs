pub mod kick;

pub use kick::Kick;

use crate::error::ResolveError;
use async_trait::async_trait;
use url::Url;

/// Resolves a broadcaster identifier to a playback manifest URL.
///
/// Implementations wrap whatever unstable page format or API the platform
/// exposes; the contract is only "identifier in, literal absolute URL out".
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self, broadcaster: &str) -> Result<Url, ResolveError>;
}
