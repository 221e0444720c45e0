use std::sync::Arc;

use serde::Serialize;

use super::node::NodeStat;
use super::watch::Watcher;
use super::Result;

pub mod zookeeper;

/// State of the session with the coordination service.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

/// Coordination service operations the node facade delegates to.
///
/// Version arguments of `None` disable the optimistic concurrency check.
pub trait Backend: Send + Sync {
    /// Current state of the session.
    fn state(&self) -> ConnectionState;

    /// Close the session.
    fn close(&self) -> Result<()>;

    /// Check if a node exists, optionally arming the session's default watcher.
    fn exists(&self, path: &str, watch: bool) -> Result<Option<NodeStat>>;

    /// Check if a node exists and arm the given one-shot watcher.
    fn exists_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<Option<NodeStat>>;

    /// Create a persistent node with an open ACL and return its path.
    fn create(&self, path: &str, data: Vec<u8>) -> Result<String>;

    /// Replace the data of a node.
    fn set_data(&self, path: &str, data: Vec<u8>, version: Option<i32>) -> Result<NodeStat>;

    /// Delete a node.
    fn delete(&self, path: &str, version: Option<i32>) -> Result<()>;

    /// List the names of the immediate children of a node.
    fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>>;

    /// Read the data of a node and arm the given one-shot watcher.
    fn get_data_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<(Vec<u8>, NodeStat)>;
}
