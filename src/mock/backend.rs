use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use super::super::backend::Backend;
use super::super::backend::ConnectionState;
use super::super::node::NodeStat;
use super::super::node::SessionState;
use super::super::node::WatchEvent;
use super::super::node::WatchEventType;
use super::super::path;
use super::super::watch::Watcher;
use super::super::ErrorKind;
use super::super::Result;

type Notifications = Vec<(Arc<dyn Watcher>, WatchEvent)>;

/// A znode stored by the mock.
struct MockNode {
    data: Vec<u8>,
    stat: NodeStat,
}

/// Everything the mock tracks, behind a single lock.
struct MockState {
    child_watches: HashMap<String, Vec<Arc<dyn Watcher>>>,
    connection: ConnectionState,
    data_watches: HashMap<String, Vec<Arc<dyn Watcher>>>,
    nodes: BTreeMap<String, MockNode>,
    zxid: i64,
}

impl MockState {
    fn check_connected(&self, op: &'static str) -> Result<()> {
        if self.connection != ConnectionState::Connected {
            return Err(ErrorKind::ConnectionLost(op).into());
        }
        Ok(())
    }

    fn next_zxid(&mut self) -> i64 {
        self.zxid += 1;
        self.zxid
    }

    /// Take the watchers registered in `watches` for `path` and pair them with an event.
    fn take_watches(
        watches: &mut HashMap<String, Vec<Arc<dyn Watcher>>>,
        path: &str,
        event_type: WatchEventType,
        notifications: &mut Notifications,
    ) {
        if let Some(watchers) = watches.remove(path) {
            for watcher in watchers {
                notifications.push((watcher, WatchEvent::node(event_type, path)));
            }
        }
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut MockNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| ErrorKind::NodeNotFound(path.to_string()).into())
    }

    /// Update the parent node after a child was added or removed.
    fn touch_parent(&mut self, path: &str, delta: i32, notifications: &mut Notifications) {
        let parent = match path::parent(path) {
            Some(parent) => parent.to_string(),
            None => return,
        };
        let zxid = self.zxid;
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.stat.num_children += delta;
            node.stat.cversion += 1;
            node.stat.pzxid = zxid;
        }
        MockState::take_watches(
            &mut self.child_watches,
            &parent,
            WatchEventType::NodeChildrenChanged,
            notifications,
        );
    }
}

/// In-memory `Backend` implementation.
pub struct MockBackend {
    default_watcher: Arc<dyn Watcher>,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(default_watcher: Arc<dyn Watcher>) -> MockBackend {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            MockNode {
                data: Vec::new(),
                stat: NodeStat::default(),
            },
        );
        let state = MockState {
            child_watches: HashMap::new(),
            connection: ConnectionState::Connected,
            data_watches: HashMap::new(),
            nodes,
            zxid: 0,
        };
        MockBackend {
            default_watcher,
            state: Mutex::new(state),
        }
    }

    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        state.nodes.get(path).map(|node| node.data.clone())
    }

    pub fn fire(&self, path: &str, event_type: WatchEventType) {
        let mut notifications = Vec::new();
        {
            let mut state = self.lock();
            MockState::take_watches(&mut state.data_watches, path, event_type, &mut notifications);
            MockState::take_watches(&mut state.child_watches, path, event_type, &mut notifications);
        }
        MockBackend::notify(notifications);
    }

    pub fn insert(&self, path: String, data: Vec<u8>) {
        let mut state = self.lock();
        let zxid = state.next_zxid();
        let stat = MockBackend::new_stat(zxid, data.len());
        let mut ignored = Vec::new();
        state.touch_parent(&path, 1, &mut ignored);
        state.nodes.insert(path, MockNode { data, stat });
    }

    pub fn set_state(&self, connection: ConnectionState) {
        self.lock().connection = connection;
        let session = match connection {
            ConnectionState::Connected => SessionState::SyncConnected,
            ConnectionState::Connecting | ConnectionState::Disconnected => {
                SessionState::Disconnected
            }
            ConnectionState::Closed => SessionState::Expired,
        };
        self.default_watcher.handle(WatchEvent::session(session));
    }
}

impl MockBackend {
    fn lock(&self) -> ::std::sync::MutexGuard<MockState> {
        self.state.lock().expect("MockBackend::state lock poisoned")
    }

    fn new_stat(zxid: i64, data_length: usize) -> NodeStat {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|time| time.as_millis() as i64)
            .unwrap_or_default();
        NodeStat {
            czxid: zxid,
            mzxid: zxid,
            ctime: now,
            mtime: now,
            data_length: data_length as i32,
            pzxid: zxid,
            ..NodeStat::default()
        }
    }

    /// Deliver events once the state lock has been released.
    fn notify(notifications: Notifications) {
        for (watcher, event) in notifications {
            watcher.handle(event);
        }
    }

    fn check_version(path: &str, node: &MockNode, version: Option<i32>) -> Result<()> {
        match version {
            Some(version) if version != node.stat.version => {
                Err(ErrorKind::VersionConflict(path.to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

impl Backend for MockBackend {
    fn state(&self) -> ConnectionState {
        self.lock().connection
    }

    fn close(&self) -> Result<()> {
        self.lock().connection = ConnectionState::Closed;
        Ok(())
    }

    fn exists(&self, path: &str, watch: bool) -> Result<Option<NodeStat>> {
        let mut state = self.lock();
        state.check_connected("exists")?;
        if watch {
            state
                .data_watches
                .entry(path.to_string())
                .or_default()
                .push(Arc::clone(&self.default_watcher));
        }
        Ok(state.nodes.get(path).map(|node| node.stat.clone()))
    }

    fn exists_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<Option<NodeStat>> {
        let mut state = self.lock();
        state.check_connected("exists")?;
        state
            .data_watches
            .entry(path.to_string())
            .or_default()
            .push(watcher);
        Ok(state.nodes.get(path).map(|node| node.stat.clone()))
    }

    fn create(&self, path: &str, data: Vec<u8>) -> Result<String> {
        let mut notifications = Vec::new();
        {
            let mut state = self.lock();
            state.check_connected("create")?;
            if state.nodes.contains_key(path) {
                return Err(ErrorKind::NodeExists(path.to_string()).into());
            }
            let parent_exists = path::parent(path)
                .map(|parent| state.nodes.contains_key(parent))
                .unwrap_or(false);
            if !parent_exists {
                return Err(ErrorKind::NodeNotFound(path.to_string()).into());
            }
            let zxid = state.next_zxid();
            let stat = MockBackend::new_stat(zxid, data.len());
            state.nodes.insert(path.to_string(), MockNode { data, stat });
            state.touch_parent(path, 1, &mut notifications);
            MockState::take_watches(
                &mut state.data_watches,
                path,
                WatchEventType::NodeCreated,
                &mut notifications,
            );
        }
        MockBackend::notify(notifications);
        Ok(path.to_string())
    }

    fn set_data(&self, path: &str, data: Vec<u8>, version: Option<i32>) -> Result<NodeStat> {
        let mut notifications = Vec::new();
        let stat = {
            let mut state = self.lock();
            state.check_connected("set_data")?;
            let zxid = state.next_zxid();
            let node = state.node_mut(path)?;
            MockBackend::check_version(path, node, version)?;
            let fresh = MockBackend::new_stat(zxid, data.len());
            node.data = data;
            node.stat.version += 1;
            node.stat.mzxid = zxid;
            node.stat.mtime = fresh.mtime;
            node.stat.data_length = fresh.data_length;
            let stat = node.stat.clone();
            MockState::take_watches(
                &mut state.data_watches,
                path,
                WatchEventType::NodeDataChanged,
                &mut notifications,
            );
            stat
        };
        MockBackend::notify(notifications);
        Ok(stat)
    }

    fn delete(&self, path: &str, version: Option<i32>) -> Result<()> {
        let mut notifications = Vec::new();
        {
            let mut state = self.lock();
            state.check_connected("delete")?;
            if path == "/" {
                return Err(ErrorKind::Backend("delete").into());
            }
            let node = state.node_mut(path)?;
            MockBackend::check_version(path, node, version)?;
            if node.stat.num_children > 0 {
                return Err(ErrorKind::NotEmpty(path.to_string()).into());
            }
            state.nodes.remove(path);
            state.next_zxid();
            state.touch_parent(path, -1, &mut notifications);
            MockState::take_watches(
                &mut state.data_watches,
                path,
                WatchEventType::NodeDeleted,
                &mut notifications,
            );
            MockState::take_watches(
                &mut state.child_watches,
                path,
                WatchEventType::NodeDeleted,
                &mut notifications,
            );
        }
        MockBackend::notify(notifications);
        Ok(())
    }

    fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.check_connected("get_children")?;
        if !state.nodes.contains_key(path) {
            return Err(ErrorKind::NodeNotFound(path.to_string()).into());
        }
        let children = state
            .nodes
            .keys()
            .filter(|key| key.as_str() != "/" && path::parent(key) == Some(path))
            .map(|key| path::name(key).to_string())
            .collect();
        if watch {
            state
                .child_watches
                .entry(path.to_string())
                .or_default()
                .push(Arc::clone(&self.default_watcher));
        }
        Ok(children)
    }

    fn get_data_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<(Vec<u8>, NodeStat)> {
        let mut state = self.lock();
        state.check_connected("get_data")?;
        let (data, stat) = match state.nodes.get(path) {
            Some(node) => (node.data.clone(), node.stat.clone()),
            None => return Err(ErrorKind::NodeNotFound(path.to_string()).into()),
        };
        state
            .data_watches
            .entry(path.to_string())
            .or_default()
            .push(watcher);
        Ok((data, stat))
    }
}
