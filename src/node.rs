use serde::Deserialize;
use serde::Serialize;

/// Metadata the coordination service keeps about a node.
///
/// All values are assigned by the service and reported as is.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct NodeStat {
    /// Transaction that created the node.
    pub czxid: i64,
    /// Transaction that last modified the node.
    pub mzxid: i64,
    /// Creation time, in milliseconds since the epoch.
    pub ctime: i64,
    /// Last modification time, in milliseconds since the epoch.
    pub mtime: i64,
    /// Number of changes to the node data.
    pub version: i32,
    /// Number of changes to the node children.
    pub cversion: i32,
    /// Number of changes to the node ACL.
    pub aversion: i32,
    /// Session that owns the node if ephemeral, 0 otherwise.
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    /// Transaction that last modified the node children.
    pub pzxid: i64,
}

/// Type of change a watch was notified about.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum WatchEventType {
    /// The event is about the session state rather than a node.
    Session,
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
    DataWatchRemoved,
    ChildWatchRemoved,
}

/// Session state reported along with every watch event.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    SyncConnected,
    AuthFailed,
    ConnectedReadOnly,
    SaslAuthenticated,
    Expired,
}

/// Notification delivered to a `Watcher`.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    pub state: SessionState,
    /// Path of the affected node (session events have no path).
    pub path: Option<String>,
}

impl WatchEvent {
    /// Build an event about a node change.
    pub fn node<S: Into<String>>(event_type: WatchEventType, path: S) -> WatchEvent {
        WatchEvent {
            event_type,
            state: SessionState::SyncConnected,
            path: Some(path.into()),
        }
    }

    /// Build an event about a session state change.
    pub fn session(state: SessionState) -> WatchEvent {
        WatchEvent {
            event_type: WatchEventType::Session,
            state,
            path: None,
        }
    }

    /// Check if the event is about the session rather than a node.
    pub fn is_session(&self) -> bool {
        self.event_type == WatchEventType::Session
    }
}
