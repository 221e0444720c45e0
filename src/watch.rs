use std::sync::Arc;
use std::sync::Weak;

use slog::debug;
use slog::info;
use slog::warn;
use slog::Logger;

use super::backend::Backend;
use super::node::WatchEvent;

/// Receiver of watch notifications.
///
/// Watches are one-shot: once a watcher is notified about a node event it will
/// not be notified again unless it is registered again.
pub trait Watcher: Send + Sync {
    /// Handle a notification.
    fn handle(&self, event: WatchEvent);
}

impl<WatchFn> Watcher for WatchFn
where
    WatchFn: Fn(WatchEvent) + Send + Sync,
{
    fn handle(&self, event: WatchEvent) {
        self(event)
    }
}

/// Watcher that logs every event it receives and does nothing else.
#[derive(Clone)]
pub struct LoggingWatcher {
    logger: Logger,
}

impl LoggingWatcher {
    pub fn new(logger: Logger) -> LoggingWatcher {
        LoggingWatcher { logger }
    }
}

impl Watcher for LoggingWatcher {
    fn handle(&self, event: WatchEvent) {
        info!(
            self.logger, "Watch event received";
            "state" => ?event.state,
            "path" => ?event.path,
            "type" => ?event.event_type,
        );
    }
}

/// Watcher that registers itself again after every node event.
///
/// Events are forwarded to the wrapped watcher first.
/// The watch stops when registration fails or the backend is dropped.
#[derive(Clone)]
pub(crate) struct RearmingWatcher {
    backend: Weak<dyn Backend>,
    inner: Arc<dyn Watcher>,
    logger: Logger,
    path: String,
}

impl RearmingWatcher {
    pub fn new(
        backend: &Arc<dyn Backend>,
        path: String,
        inner: Arc<dyn Watcher>,
        logger: Logger,
    ) -> RearmingWatcher {
        RearmingWatcher {
            backend: Arc::downgrade(backend),
            inner,
            logger,
            path,
        }
    }
}

impl Watcher for RearmingWatcher {
    fn handle(&self, event: WatchEvent) {
        let session = event.is_session();
        self.inner.handle(event);
        if session {
            return;
        }
        let backend = match self.backend.upgrade() {
            Some(backend) => backend,
            None => {
                debug!(self.logger, "Backend gone, not re-arming watch"; "path" => &self.path);
                return;
            }
        };
        let watcher: Arc<dyn Watcher> = Arc::new(self.clone());
        match backend.exists_w(&self.path, watcher) {
            Ok(_) => debug!(self.logger, "Re-armed watch"; "path" => &self.path),
            Err(error) => warn!(
                self.logger, "Failed to re-arm watch";
                "path" => &self.path,
                "error" => %error,
            ),
        };
    }
}
