use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::bounded;
use failure::ResultExt;
use slog::debug;
use slog::error;
use slog::info;
use slog::warn;
use slog::Logger;

use zookeeper::WatchedEvent;
use zookeeper::ZkResult;
use zookeeper::ZkState;
use zookeeper::ZooKeeper;

use super::super::super::config::ZookeeperConfig;
use super::super::super::node::SessionState;
use super::super::super::node::WatchEvent;
use super::super::super::watch::Watcher;
use super::super::super::ErrorKind;
use super::super::super::Result;
use super::super::ConnectionState;
use super::metrics::ZOO_CONNECTION_COUNT;

/// Owner of the single `ZooKeeper` session used by the process.
///
/// The session is not re-established if it is lost.
pub struct Client {
    closed: AtomicBool,
    keeper: ZooKeeper,
    logger: Logger,
    state: Arc<Mutex<ConnectionState>>,
}

impl Client {
    /// Open a session and wait for it to be connected.
    ///
    /// Every event delivered to the session's default watcher is forwarded to
    /// `default_watcher`, including session state changes.
    pub fn connect(
        config: &ZookeeperConfig,
        default_watcher: Arc<dyn Watcher>,
        logger: Logger,
    ) -> Result<Client> {
        info!(
            logger, "Initiating new zookeeper session";
            "address" => &config.address,
            "timeout" => config.timeout,
        );
        let (connected, wait_connected) = bounded(1);
        let session_timeout = Duration::from_millis(config.timeout);
        let keeper = ZooKeeper::connect(
            &config.address,
            session_timeout,
            move |event: WatchedEvent| {
                let event = WatchEvent::from(event);
                if event.is_session() && event.state == SessionState::SyncConnected {
                    // Only the first signal matters, later ones find the channel full.
                    let _ = connected.try_send(());
                }
                default_watcher.handle(event);
            },
        )
        .context(ErrorKind::Connect)?;
        ZOO_CONNECTION_COUNT.inc();

        // Track session state changes.
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));
        let notify_state = Arc::clone(&state);
        let listener_logger = logger.clone();
        keeper.add_listener(move |zk_state| {
            let new_state = Client::track_state(&listener_logger, zk_state);
            let mut current = notify_state
                .lock()
                .expect("zookeeper connection state lock was poisoned");
            *current = new_state;
        });

        let connect_timeout = config.connect_timeout();
        if wait_connected.recv_timeout(connect_timeout).is_err() {
            error!(
                logger, "Zookeeper session not established in time";
                "address" => &config.address,
                "connect_timeout" => connect_timeout.as_millis() as u64,
            );
            if let Err(error) = keeper.close() {
                debug!(logger, "Failed to close pending zookeeper session"; "error" => ?error);
            }
            let timeout = connect_timeout.as_millis() as u64;
            return Err(ErrorKind::ConnectTimeout(timeout).into());
        }

        // The listener may have missed the transition if it happened before registration.
        Client::mark_connected(&state);
        info!(logger, "Zookeeper session established"; "address" => &config.address);
        Ok(Client {
            closed: AtomicBool::new(false),
            keeper,
            logger,
            state,
        })
    }

    /// Close the session, if it is still open.
    pub fn close(&self) -> ZkResult<()> {
        // The state lock must not be held here: the listener takes it while closing.
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.keeper.close()?;
        *self
            .state
            .lock()
            .expect("zookeeper connection state lock was poisoned") = ConnectionState::Closed;
        info!(self.logger, "Zookeeper session closed");
        Ok(())
    }

    /// Access the underlying `ZooKeeper` session.
    pub fn keeper(&self) -> &ZooKeeper {
        &self.keeper
    }

    /// Current state of the session.
    pub fn state(&self) -> ConnectionState {
        *self
            .state
            .lock()
            .expect("zookeeper connection state lock was poisoned")
    }
}

impl Client {
    /// Record the session as connected unless the listener already saw a later transition.
    fn mark_connected(state: &Mutex<ConnectionState>) {
        let mut current = state
            .lock()
            .expect("zookeeper connection state lock was poisoned");
        if *current == ConnectionState::Connecting {
            *current = ConnectionState::Connected;
        }
    }

    /// Log a session state change and convert it.
    #[allow(deprecated)]
    fn track_state(logger: &Logger, state: ZkState) -> ConnectionState {
        match state {
            ZkState::AuthFailed => {
                error!(logger, "Zookeeper authentication error");
                ConnectionState::Disconnected
            }
            ZkState::Closed => {
                warn!(logger, "Zookeeper session closed");
                ConnectionState::Closed
            }
            ZkState::Connected => {
                info!(logger, "Zookeeper connection successful");
                ConnectionState::Connected
            }
            ZkState::ConnectedReadOnly => {
                warn!(logger, "Zookeeper connection is read-only");
                ConnectionState::Connected
            }
            ZkState::Connecting => {
                debug!(logger, "Zookeeper session connecting");
                ConnectionState::Connecting
            }
            ZkState::NotConnected => {
                warn!(logger, "Zookeeper session not connected");
                ConnectionState::Disconnected
            }
            state => {
                debug!(logger, "Zookeeper session state changed"; "state" => ?state);
                ConnectionState::Connecting
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(self.logger, "Failed to close zookeeper session"; "error" => ?error);
        }
    }
}
