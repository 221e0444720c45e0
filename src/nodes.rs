use std::sync::Arc;

use slog::debug;
use slog::warn;
use slog::Logger;

use super::backend::zookeeper::Zookeeper;
use super::backend::Backend;
use super::backend::ConnectionState;
use super::config::ZookeeperConfig;
use super::node::NodeStat;
use super::path;
use super::watch::RearmingWatcher;
use super::watch::Watcher;
use super::ErrorKind;
use super::Result;

/// Path based node operations against the coordination service.
///
/// Failures are logged along with the node path before being returned.
/// No operation is retried.
#[derive(Clone)]
pub struct Nodes {
    backend: Arc<dyn Backend>,
    logger: Logger,
}

impl Nodes {
    /// Connect to zookeeper and return a facade for the new session.
    ///
    /// Blocks until the session is connected or the connect timeout expires.
    /// Events for the session's default watch are sent to `default_watcher`.
    pub fn connect(
        config: &ZookeeperConfig,
        default_watcher: Arc<dyn Watcher>,
        logger: Logger,
    ) -> Result<Nodes> {
        let backend = Zookeeper::new(config, default_watcher, logger.clone())?;
        Ok(Nodes::with_backend(Arc::new(backend), logger))
    }

    /// Internal method to create `Nodes` from the given backend.
    pub(crate) fn with_backend(backend: Arc<dyn Backend>, logger: Logger) -> Nodes {
        Nodes { backend, logger }
    }
}

impl Nodes {
    /// Current state of the underlying session.
    pub fn state(&self) -> ConnectionState {
        self.backend.state()
    }

    /// Check if the underlying session is connected.
    pub fn is_connected(&self) -> bool {
        self.backend.state() == ConnectionState::Connected
    }

    /// Close the underlying session.
    pub fn close(&self) -> Result<()> {
        self.backend.close()
    }

    /// Look up a node's metadata.
    ///
    /// Returns `Ok(None)` if the node does not exist.
    /// When `watch` is `true` the session's default watcher is notified of the next change.
    pub fn exists(&self, path: &str, watch: bool) -> Result<Option<NodeStat>> {
        self.checked("exists", path, || self.backend.exists(path, watch))
    }

    /// Look up a node's metadata and notify `watcher` of the next change to it.
    ///
    /// The watch is armed even if the node does not exist yet.
    pub fn exists_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<Option<NodeStat>> {
        self.checked("exists", path, || self.backend.exists_w(path, watcher))
    }

    /// Create a persistent node holding the given text.
    pub fn create_node(&self, path: &str, data: &str) -> Result<()> {
        let data = data.as_bytes().to_vec();
        self.checked("create", path, || self.backend.create(path, data))?;
        debug!(self.logger, "Created persistent node"; "path" => path);
        Ok(())
    }

    /// Replace the text stored in a node, whatever its current version.
    pub fn update_node(&self, path: &str, data: &str) -> Result<NodeStat> {
        let data = data.as_bytes().to_vec();
        self.checked("update", path, || self.backend.set_data(path, data, None))
    }

    /// Replace the text stored in a node only if it is at the expected version.
    pub fn update_node_versioned(&self, path: &str, data: &str, version: i32) -> Result<NodeStat> {
        let data = data.as_bytes().to_vec();
        self.checked("update", path, || {
            self.backend.set_data(path, data, Some(version))
        })
    }

    /// Delete a node, whatever its current version.
    pub fn delete_node(&self, path: &str) -> Result<()> {
        self.checked("delete", path, || self.backend.delete(path, None))?;
        debug!(self.logger, "Deleted node"; "path" => path);
        Ok(())
    }

    /// Delete a node only if it is at the expected version.
    pub fn delete_node_versioned(&self, path: &str, version: i32) -> Result<()> {
        self.checked("delete", path, || self.backend.delete(path, Some(version)))
    }

    /// List the names of the node's immediate children, sorted.
    pub fn get_children(&self, path: &str) -> Result<Vec<String>> {
        let mut children = self.checked("get_children", path, || {
            self.backend.get_children(path, false)
        })?;
        children.sort();
        Ok(children)
    }

    /// Read the text stored in a node and notify `watcher` of the next change to it.
    pub fn get_data(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<String> {
        let (data, _) = self.checked("get_data", path, || {
            self.backend.get_data_w(path, watcher)
        })?;
        String::from_utf8(data).map_err(|_| {
            warn!(self.logger, "Node data is not valid UTF-8"; "path" => path);
            ErrorKind::Decode(path.to_string()).into()
        })
    }

    /// Register `watcher` for the next change to the node.
    ///
    /// Watches fire once: after a notification is delivered the caller must call
    /// `watch` again to keep observing the node.
    pub fn watch(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<Option<NodeStat>> {
        self.exists_w(path, watcher)
    }

    /// Register `watcher` for all future changes to the node.
    ///
    /// The watch is registered again after every node event and stops when
    /// re-registration fails (for example because the session was lost).
    pub fn watch_continuously(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Option<NodeStat>> {
        path::validate(path)?;
        let rearm = RearmingWatcher::new(
            &self.backend,
            path.to_string(),
            watcher,
            self.logger.clone(),
        );
        self.exists_w(path, Arc::new(rearm))
    }
}

impl Nodes {
    /// Validate the path, run the operation and log failures.
    fn checked<T, F>(&self, op: &'static str, path: &str, call: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let result = path::validate(path).and_then(|_| call());
        if let Err(error) = result.as_ref() {
            warn!(
                self.logger, "Node operation failed";
                "operation" => op,
                "path" => path,
                "error" => %error,
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use crate::backend::ConnectionState;
    use crate::mock::MockZookeeper;
    use crate::node::WatchEvent;
    use crate::node::WatchEventType;
    use crate::watch::Watcher;
    use crate::ErrorKind;

    /// Watcher that records all the events it receives.
    fn recorder() -> (Arc<Mutex<Vec<WatchEvent>>>, Arc<dyn Watcher>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&events);
        let watcher: Arc<dyn Watcher> =
            Arc::new(move |event: WatchEvent| inner.lock().unwrap().push(event));
        (events, watcher)
    }

    fn noop() -> Arc<dyn Watcher> {
        Arc::new(|_: WatchEvent| ())
    }

    #[test]
    fn create_then_read() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/p", "v").unwrap();
        assert_eq!(nodes.get_data("/p", noop()).unwrap(), "v");
    }

    #[test]
    fn delete_then_missing() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/p", "v").unwrap();
        assert!(nodes.exists("/p", false).unwrap().is_some());
        nodes.delete_node("/p").unwrap();
        assert_eq!(nodes.exists("/p", false).unwrap(), None);
    }

    #[test]
    fn update_ignores_version() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/p", "v").unwrap();
        nodes.update_node("/p", "v1").unwrap();
        let stat = nodes.update_node("/p", "v2").unwrap();
        assert_eq!(stat.version, 2);
        assert_eq!(nodes.get_data("/p", noop()).unwrap(), "v2");
    }

    #[test]
    fn versioned_update_conflicts() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/p", "v").unwrap();
        nodes.update_node_versioned("/p", "v1", 0).unwrap();
        let error = nodes.update_node_versioned("/p", "v2", 0).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::VersionConflict("/p".into()));
        let error = nodes.delete_node_versioned("/p", 0).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::VersionConflict("/p".into()));
        nodes.delete_node_versioned("/p", 1).unwrap();
        assert_eq!(nodes.exists("/p", false).unwrap(), None);
    }

    #[test]
    fn create_duplicate_is_typed() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/p", "v").unwrap();
        let error = nodes.create_node("/p", "other").unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::NodeExists("/p".into()));
        assert_eq!(nodes.get_data("/p", noop()).unwrap(), "v");
    }

    #[test]
    fn create_without_parent_fails() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let error = nodes.create_node("/a/b", "v").unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::NodeNotFound("/a/b".into()));
    }

    #[test]
    fn delete_with_children_fails() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/a", "").unwrap();
        nodes.create_node("/a/b", "").unwrap();
        let error = nodes.delete_node("/a").unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::NotEmpty("/a".into()));
    }

    #[test]
    fn missing_nodes_are_errors() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        assert!(nodes.get_data("/missing", noop()).unwrap_err().is_not_found());
        assert!(nodes.update_node("/missing", "v").unwrap_err().is_not_found());
        assert!(nodes.delete_node("/missing").unwrap_err().is_not_found());
    }

    #[test]
    fn children_missing_propagates() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let error = nodes.get_children("/missing").unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::NodeNotFound("/missing".into()));
    }

    #[test]
    fn children_are_sorted_and_shallow() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        nodes.create_node("/a", "").unwrap();
        nodes.create_node("/a/c", "").unwrap();
        nodes.create_node("/a/b", "").unwrap();
        nodes.create_node("/a/b/deep", "").unwrap();
        assert_eq!(nodes.get_children("/a").unwrap(), vec!["b", "c"]);
        let stat = nodes.exists("/a", false).unwrap().unwrap();
        assert_eq!(stat.num_children, 2);
        assert_eq!(nodes.get_children("/").unwrap(), vec!["a"]);
    }

    #[test]
    fn invalid_paths_are_rejected() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let error = nodes.create_node("relative", "v").unwrap_err();
        match error.kind() {
            ErrorKind::InvalidPath(path, _) => assert_eq!(path, "relative"),
            kind => panic!("unexpected error: {}", kind),
        }
    }

    #[test]
    fn not_connected_returns_errors() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        assert!(nodes.is_connected());
        mock.set_state(ConnectionState::Disconnected);
        assert_eq!(nodes.state(), ConnectionState::Disconnected);
        assert!(!nodes.is_connected());
        let lost = |kind: &ErrorKind| matches!(kind, ErrorKind::ConnectionLost(_));
        assert!(lost(nodes.exists("/p", false).unwrap_err().kind()));
        assert!(lost(nodes.exists_w("/p", noop()).unwrap_err().kind()));
        assert!(lost(nodes.create_node("/p", "v").unwrap_err().kind()));
        assert!(lost(nodes.update_node("/p", "v").unwrap_err().kind()));
        assert!(lost(nodes.delete_node("/p").unwrap_err().kind()));
        assert!(lost(nodes.get_children("/").unwrap_err().kind()));
        assert!(lost(nodes.get_data("/p", noop()).unwrap_err().kind()));
    }

    #[test]
    fn data_must_be_utf8() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        mock.insert("/bin", vec![0xff, 0xfe]);
        let error = nodes.get_data("/bin", noop()).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::Decode("/bin".into()));
    }

    #[test]
    fn data_watch_fires_once() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let (events, watcher) = recorder();
        nodes.create_node("/p", "v").unwrap();
        nodes.get_data("/p", watcher).unwrap();
        nodes.update_node("/p", "v2").unwrap();
        nodes.update_node("/p", "v3").unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![WatchEvent::node(WatchEventType::NodeDataChanged, "/p")]
        );
    }

    #[test]
    fn exists_watch_sees_creation() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let (events, watcher) = recorder();
        assert_eq!(nodes.exists_w("/p", watcher).unwrap(), None);
        nodes.create_node("/p", "v").unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![WatchEvent::node(WatchEventType::NodeCreated, "/p")]
        );
    }

    #[test]
    fn default_watch_goes_to_default_watcher() {
        let (events, watcher) = recorder();
        let mock = MockZookeeper::with_default_watcher(watcher);
        let nodes = mock.nodes();
        nodes.create_node("/p", "v").unwrap();
        nodes.exists("/p", true).unwrap();
        nodes.exists("/other", false).unwrap();
        nodes.delete_node("/p").unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![WatchEvent::node(WatchEventType::NodeDeleted, "/p")]
        );
    }

    #[test]
    fn watch_needs_rearming() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let (events, watcher) = recorder();
        nodes.create_node("/p", "v").unwrap();
        nodes.watch("/p", Arc::clone(&watcher)).unwrap();
        nodes.update_node("/p", "v1").unwrap();
        nodes.update_node("/p", "v2").unwrap();
        assert_eq!(events.lock().unwrap().len(), 1);
        nodes.watch("/p", watcher).unwrap();
        nodes.update_node("/p", "v3").unwrap();
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn continuous_watch_sees_every_change() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let (events, watcher) = recorder();
        nodes.watch_continuously("/p", watcher).unwrap();
        nodes.create_node("/p", "v").unwrap();
        nodes.update_node("/p", "v1").unwrap();
        nodes.delete_node("/p").unwrap();
        let types: Vec<WatchEventType> = events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                WatchEventType::NodeCreated,
                WatchEventType::NodeDataChanged,
                WatchEventType::NodeDeleted,
            ]
        );
    }

    #[test]
    fn continuous_watch_stops_when_disconnected() {
        let mock = MockZookeeper::new();
        let nodes = mock.nodes();
        let (events, watcher) = recorder();
        nodes.create_node("/p", "v").unwrap();
        nodes.watch_continuously("/p", watcher).unwrap();
        mock.fire("/p", WatchEventType::NodeDataChanged);
        mock.set_state(ConnectionState::Disconnected);
        mock.fire("/p", WatchEventType::NodeDataChanged);
        mock.set_state(ConnectionState::Connected);
        mock.fire("/p", WatchEventType::NodeDataChanged);
        assert_eq!(events.lock().unwrap().len(), 2);
    }
}
