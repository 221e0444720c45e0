use std::sync::Arc;

use failure::Fail;
use slog::debug;
use slog::Logger;

use zookeeper::Acl;
use zookeeper::CreateMode;
use zookeeper::KeeperState;
use zookeeper::Stat;
use zookeeper::WatchedEvent;
use zookeeper::WatchedEventType;
use zookeeper::ZkError;
use zookeeper::ZkResult;

use super::super::config::ZookeeperConfig;
use super::super::node::NodeStat;
use super::super::node::SessionState;
use super::super::node::WatchEvent;
use super::super::node::WatchEventType;
use super::super::watch::Watcher;
use super::super::Error;
use super::super::ErrorKind;
use super::super::Result;
use super::Backend;
use super::ConnectionState;

mod client;
mod metrics;

pub use self::client::Client;
pub use self::metrics::register_metrics;

use self::metrics::ZOO_OP_DURATION;
use self::metrics::ZOO_OP_ERRORS_COUNT;
use self::metrics::ZOO_TIMEOUTS_COUNT;

/// Zookeeper-backed node operations.
pub struct Zookeeper {
    client: Client,
    logger: Logger,
}

impl Zookeeper {
    pub fn new(
        config: &ZookeeperConfig,
        default_watcher: Arc<dyn Watcher>,
        logger: Logger,
    ) -> Result<Zookeeper> {
        let client = Client::connect(config, default_watcher, logger.clone())?;
        Ok(Zookeeper { client, logger })
    }

    /// Run a zookeeper operation and track its duration and outcome.
    fn observe<T, F>(&self, op: &'static str, path: &str, call: F) -> Result<T>
    where
        F: FnOnce() -> ZkResult<T>,
    {
        let timer = ZOO_OP_DURATION.with_label_values(&[op]).start_timer();
        let result = call();
        timer.observe_duration();
        result.map_err(|error| {
            ZOO_OP_ERRORS_COUNT.with_label_values(&[op]).inc();
            if error == ZkError::OperationTimeout {
                ZOO_TIMEOUTS_COUNT.inc();
            }
            debug!(
                self.logger, "Zookeeper operation failed";
                "operation" => op,
                "path" => path,
                "error" => ?error,
            );
            zk_error(error, op, path)
        })
    }
}

impl Backend for Zookeeper {
    fn state(&self) -> ConnectionState {
        self.client.state()
    }

    fn close(&self) -> Result<()> {
        self.observe("close", "/", || self.client.close())
    }

    fn exists(&self, path: &str, watch: bool) -> Result<Option<NodeStat>> {
        let keeper = self.client.keeper();
        let stat = self.observe("exists", path, || keeper.exists(path, watch))?;
        Ok(stat.map(NodeStat::from))
    }

    fn exists_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<Option<NodeStat>> {
        let keeper = self.client.keeper();
        let stat = self.observe("exists", path, || {
            keeper.exists_w(path, move |event: WatchedEvent| {
                watcher.handle(WatchEvent::from(event))
            })
        })?;
        Ok(stat.map(NodeStat::from))
    }

    fn create(&self, path: &str, data: Vec<u8>) -> Result<String> {
        let keeper = self.client.keeper();
        self.observe("create", path, || {
            keeper.create(
                path,
                data,
                Acl::open_unsafe().clone(),
                CreateMode::Persistent,
            )
        })
    }

    fn set_data(&self, path: &str, data: Vec<u8>, version: Option<i32>) -> Result<NodeStat> {
        let keeper = self.client.keeper();
        let stat = self.observe("set_data", path, || keeper.set_data(path, data, version))?;
        Ok(NodeStat::from(stat))
    }

    fn delete(&self, path: &str, version: Option<i32>) -> Result<()> {
        let keeper = self.client.keeper();
        self.observe("delete", path, || keeper.delete(path, version))
    }

    fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>> {
        let keeper = self.client.keeper();
        self.observe("get_children", path, || keeper.get_children(path, watch))
    }

    fn get_data_w(&self, path: &str, watcher: Arc<dyn Watcher>) -> Result<(Vec<u8>, NodeStat)> {
        let keeper = self.client.keeper();
        let (data, stat) = self.observe("get_data", path, || {
            keeper.get_data_w(path, move |event: WatchedEvent| {
                watcher.handle(WatchEvent::from(event))
            })
        })?;
        Ok((data, NodeStat::from(stat)))
    }
}

/// Convert a zookeeper error into a typed error for the given operation.
fn zk_error(error: ZkError, op: &'static str, path: &str) -> Error {
    let kind = match error {
        ZkError::NoNode => ErrorKind::NodeNotFound(path.to_string()),
        ZkError::NodeExists => ErrorKind::NodeExists(path.to_string()),
        ZkError::NotEmpty => ErrorKind::NotEmpty(path.to_string()),
        ZkError::BadVersion => ErrorKind::VersionConflict(path.to_string()),
        ZkError::ConnectionLoss | ZkError::SessionExpired => ErrorKind::ConnectionLost(op),
        ZkError::OperationTimeout => ErrorKind::Timeout(op),
        _ => ErrorKind::Backend(op),
    };
    error.context(kind).into()
}

impl From<Stat> for NodeStat {
    fn from(stat: Stat) -> NodeStat {
        NodeStat {
            czxid: stat.czxid,
            mzxid: stat.mzxid,
            ctime: stat.ctime,
            mtime: stat.mtime,
            version: stat.version,
            cversion: stat.cversion,
            aversion: stat.aversion,
            ephemeral_owner: stat.ephemeral_owner,
            data_length: stat.data_length,
            num_children: stat.num_children,
            pzxid: stat.pzxid,
        }
    }
}

impl From<KeeperState> for SessionState {
    fn from(state: KeeperState) -> SessionState {
        match state {
            KeeperState::Disconnected => SessionState::Disconnected,
            KeeperState::SyncConnected => SessionState::SyncConnected,
            KeeperState::AuthFailed => SessionState::AuthFailed,
            KeeperState::ConnectedReadOnly => SessionState::ConnectedReadOnly,
            KeeperState::SaslAuthenticated => SessionState::SaslAuthenticated,
            KeeperState::Expired => SessionState::Expired,
        }
    }
}

impl From<WatchedEventType> for WatchEventType {
    fn from(event_type: WatchedEventType) -> WatchEventType {
        match event_type {
            WatchedEventType::None => WatchEventType::Session,
            WatchedEventType::NodeCreated => WatchEventType::NodeCreated,
            WatchedEventType::NodeDeleted => WatchEventType::NodeDeleted,
            WatchedEventType::NodeDataChanged => WatchEventType::NodeDataChanged,
            WatchedEventType::NodeChildrenChanged => WatchEventType::NodeChildrenChanged,
            WatchedEventType::DataWatchRemoved => WatchEventType::DataWatchRemoved,
            WatchedEventType::ChildWatchRemoved => WatchEventType::ChildWatchRemoved,
        }
    }
}

impl From<WatchedEvent> for WatchEvent {
    fn from(event: WatchedEvent) -> WatchEvent {
        WatchEvent {
            event_type: WatchEventType::from(event.event_type),
            state: SessionState::from(event.keeper_state),
            path: event.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use zookeeper::KeeperState;
    use zookeeper::WatchedEvent;
    use zookeeper::WatchedEventType;
    use zookeeper::ZkError;

    use super::zk_error;
    use crate::node::SessionState;
    use crate::node::WatchEvent;
    use crate::node::WatchEventType;
    use crate::ErrorKind;

    #[test]
    fn errors_are_typed() {
        let kind = |error| zk_error(error, "get_data", "/a").kind().clone();
        assert_eq!(kind(ZkError::NoNode), ErrorKind::NodeNotFound("/a".into()));
        assert_eq!(kind(ZkError::NodeExists), ErrorKind::NodeExists("/a".into()));
        assert_eq!(kind(ZkError::NotEmpty), ErrorKind::NotEmpty("/a".into()));
        assert_eq!(kind(ZkError::BadVersion), ErrorKind::VersionConflict("/a".into()));
        assert_eq!(kind(ZkError::ConnectionLoss), ErrorKind::ConnectionLost("get_data"));
        assert_eq!(kind(ZkError::SessionExpired), ErrorKind::ConnectionLost("get_data"));
        assert_eq!(kind(ZkError::OperationTimeout), ErrorKind::Timeout("get_data"));
        assert_eq!(kind(ZkError::NoAuth), ErrorKind::Backend("get_data"));
    }

    #[test]
    fn node_events_convert() {
        let event = WatchedEvent {
            event_type: WatchedEventType::NodeDataChanged,
            keeper_state: KeeperState::SyncConnected,
            path: Some("/a".into()),
        };
        let event = WatchEvent::from(event);
        assert_eq!(event, WatchEvent::node(WatchEventType::NodeDataChanged, "/a"));
    }

    #[test]
    fn session_events_convert() {
        let event = WatchedEvent {
            event_type: WatchedEventType::None,
            keeper_state: KeeperState::Expired,
            path: None,
        };
        let event = WatchEvent::from(event);
        assert!(event.is_session());
        assert_eq!(event.state, SessionState::Expired);
    }
}
