use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Process-wide count of simulated viewers currently inside their playback
/// loop. Never negative: a decrement on zero is a no-op.
#[derive(Debug, Default)]
pub struct ViewerRegistry {
    count: Mutex<u64>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        let mut count = self.count.lock();
        *count += 1;
        info!("viewer joined, total: {}", *count);
    }

    pub fn decrement(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        info!("viewer left, total: {}", *count);
    }

    pub fn count(&self) -> u64 {
        *self.count.lock()
    }
}

/// Scoped registration of one viewer: increments on construction and
/// decrements exactly once on drop, whichever way the playback loop exits.
pub struct ViewerGuard {
    registry: Arc<ViewerRegistry>,
}

impl ViewerGuard {
    pub fn register(registry: Arc<ViewerRegistry>) -> Self {
        registry.increment();
        Self { registry }
    }
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.registry.decrement();
    }
}
