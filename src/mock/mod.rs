use std::sync::Arc;

use slog::o;
use slog::Discard;
use slog::Logger;

use super::backend::Backend;
use super::backend::ConnectionState;
use super::node::WatchEvent;
use super::node::WatchEventType;
use super::watch::Watcher;
use super::Nodes;

mod backend;

use self::backend::MockBackend;

/// Helper to mock a zookeeper ensemble in memory.
///
/// The mock starts connected with only the root node.
pub struct MockZookeeper {
    backend: Arc<MockBackend>,
}

impl Default for MockZookeeper {
    fn default() -> Self {
        MockZookeeper::new()
    }
}

impl MockZookeeper {
    pub fn new() -> MockZookeeper {
        MockZookeeper::with_default_watcher(Arc::new(|_: WatchEvent| ()))
    }

    /// Create a mock that delivers default watch events to the given watcher.
    pub fn with_default_watcher(default_watcher: Arc<dyn Watcher>) -> MockZookeeper {
        MockZookeeper {
            backend: Arc::new(MockBackend::new(default_watcher)),
        }
    }

    /// Return a `Nodes` facade operating on this mock.
    pub fn nodes(&self) -> Nodes {
        let backend: Arc<dyn Backend> = Arc::clone(&self.backend) as Arc<dyn Backend>;
        Nodes::with_backend(backend, Logger::root(Discard, o!()))
    }

    /// Raw data stored at the given path, if the node exists.
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.backend.data(path)
    }

    /// Deliver an event to the watchers registered on the path without changing any node.
    pub fn fire(&self, path: &str, event_type: WatchEventType) {
        self.backend.fire(path, event_type)
    }

    /// Store raw data at the given path, bypassing all checks and watches.
    pub fn insert<S: Into<String>>(&self, path: S, data: Vec<u8>) {
        self.backend.insert(path.into(), data)
    }

    /// Change the connection state and notify the default watcher.
    pub fn set_state(&self, state: ConnectionState) {
        self.backend.set_state(state)
    }
}
