use std::sync::Arc;

use clap::Parser;
use slog::debug;
use slog::error;
use slog::info;
use slog::warn;
use slog::Logger;

mod backend;
mod commands;
mod config;
mod error;
mod logging;
mod node;
mod nodes;
pub mod path;
mod watch;

#[cfg(any(test, feature = "with_test_support"))]
pub mod mock;

pub use self::backend::zookeeper::register_metrics;
pub use self::backend::ConnectionState;
pub use self::config::Config;
pub use self::config::SelfTestConfig;
pub use self::config::ZookeeperConfig;
pub use self::error::format_fail;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::error::Result;
pub use self::logging::Config as LoggingConfig;
pub use self::logging::LoggingDrain;
pub use self::logging::LoggingLevel;
pub use self::node::NodeStat;
pub use self::node::SessionState;
pub use self::node::WatchEvent;
pub use self::node::WatchEventType;
pub use self::nodes::Nodes;
pub use self::watch::LoggingWatcher;
pub use self::watch::Watcher;

use self::commands::Cli;
use self::commands::Command;

/// Connect to zookeeper, run the self-test and the requested command.
///
/// The session is owned here and closed before returning.
fn initialise_and_run(command: Option<Command>, config: Config, logger: Logger) -> Result<()> {
    register_metrics(&logger, prometheus::default_registry());

    info!(logger, "Connecting to zookeeper ...");
    let sink: Arc<dyn Watcher> = Arc::new(LoggingWatcher::new(logger.clone()));
    let nodes = Nodes::connect(&config.zookeeper, Arc::clone(&sink), logger.clone())?;

    if config.self_test.enabled {
        self_test::run(&nodes, &config.self_test, Arc::clone(&sink), &logger)?;
    } else {
        debug!(logger, "Startup self-test disabled");
    }

    let result = match command {
        Some(command) => commands::run(command, &nodes, &logger),
        None => Ok(()),
    };
    if let Err(error) = nodes.close() {
        warn!(logger, "Failed to close zookeeper session"; "error" => %error);
    }
    result
}

/// Parse command line, load configuration, initialise logger.
///
/// Once the configuration is loaded control is passed to `initialise_and_run`.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Log initialisation start message.
    let logger = logging::starter();
    info!(logger, "Starting zkfacade");

    // Load configuration.
    info!(logger, "Loading configuration ..."; "config" => &cli.config);
    let mut config = Config::from_file(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    let logger = logging::configure(config.logging.clone());
    debug!(logger, "Logging configured");

    let result = initialise_and_run(cli.command, config, logger.clone());
    if let Err(error) = result.as_ref() {
        error!(logger, "zkfacade exiting with error"; "error" => %error);
    } else {
        debug!(logger, "zkfacade exiting with success");
    }
    result
}
