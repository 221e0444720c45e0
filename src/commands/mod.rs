use clap::Parser;
use clap::Subcommand;
use slog::debug;
use slog::Logger;

use super::logging::LoggingLevel;
use super::Nodes;
use super::Result;

mod node;
mod watch;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "zkfacade", version, about)]
pub struct Cli {
    /// Specifies the configuration file to use.
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "zkfacade.yaml",
        global = true
    )]
    pub config: String,

    /// Specifies the logging verbosity, overriding the configuration file.
    #[arg(long, value_name = "LEVEL", value_enum, ignore_case = true, global = true)]
    pub log_level: Option<LoggingLevel>,

    /// Operation to run once the session is connected and the self-test passed.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Node operations available from the command line.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the metadata of a node, if it exists.
    Exists {
        path: String,

        /// Arm the session's default watch on the node.
        #[arg(long)]
        watch: bool,
    },

    /// Create a persistent node.
    Create { path: String, data: String },

    /// Replace the data of a node.
    Update {
        path: String,
        data: String,

        /// Only update if the node is at this version.
        #[arg(long)]
        expected_version: Option<i32>,
    },

    /// Delete a node.
    Delete {
        path: String,

        /// Only delete if the node is at this version.
        #[arg(long)]
        expected_version: Option<i32>,
    },

    /// List the immediate children of a node.
    Children { path: String },

    /// Print the data stored in a node.
    Get { path: String },

    /// Wait for changes to a node and print them.
    Watch {
        path: String,

        /// Number of events to wait for before exiting.
        #[arg(long, default_value_t = 1)]
        events: usize,

        /// Re-arm the watch after every event.
        #[arg(long)]
        continuous: bool,
    },
}

/// Switch the control flow to the requested command.
pub fn run(command: Command, nodes: &Nodes, logger: &Logger) -> Result<()> {
    debug!(logger, "Running command"; "command" => ?command);
    match command {
        Command::Exists { path, watch } => node::exists(nodes, &path, watch),
        Command::Create { path, data } => node::create(nodes, &path, &data),
        Command::Update {
            path,
            data,
            expected_version,
        } => node::update(nodes, &path, &data, expected_version),
        Command::Delete {
            path,
            expected_version,
        } => node::delete(nodes, &path, expected_version),
        Command::Children { path } => node::children(nodes, &path),
        Command::Get { path } => node::get(nodes, &path, logger),
        Command::Watch {
            path,
            events,
            continuous,
        } => watch::run(nodes, &path, events, continuous, logger).map(|_| ()),
    }
}
