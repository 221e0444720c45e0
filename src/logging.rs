use std::io::stdout;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use slog::o;
use slog::Drain;
use slog::IgnoreResult;
use slog::Logger;
use slog::Never;
use slog::OwnedKVList;
use slog::Record;
use slog::SendSyncRefUnwindSafeDrain;
use slog::SendSyncUnwindSafeDrain;
use slog_async::Async;
use slog_json::Json;
use slog_term::FullFormat;
use slog_term::TermDecorator;

/// List of supported logging drains.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingDrain {
    /// Log JSON objects to standard output.
    #[default]
    Json,

    /// Log human readable lines to standard output.
    Term,
}

/// Enumerate valid log verbosity levels.
#[derive(clap::ValueEnum, Clone, Copy, Default, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl From<LoggingLevel> for ::slog::Level {
    fn from(level: LoggingLevel) -> Self {
        match level {
            LoggingLevel::Critical => ::slog::Level::Critical,
            LoggingLevel::Error => ::slog::Level::Error,
            LoggingLevel::Warning => ::slog::Level::Warning,
            LoggingLevel::Info => ::slog::Level::Info,
            LoggingLevel::Debug => ::slog::Level::Debug,
        }
    }
}

/// Logging configuration options.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Flush logs asynchronously.
    #[serde(default = "Config::default_async", rename = "async")]
    pub async_flush: bool,

    /// The drain to send logs to.
    #[serde(default)]
    pub drain: LoggingDrain,

    /// The minimum logging level.
    #[serde(default)]
    pub level: LoggingLevel,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            async_flush: Config::default_async(),
            drain: LoggingDrain::default(),
            level: LoggingLevel::default(),
        }
    }
}

impl Config {
    /// Default value for `async` used by serde.
    fn default_async() -> bool {
        true
    }
}

/// Alternative implementation of slog's [`LevelFilter`] with `Ok == ()`.
///
/// The default [`LevelFilter`] implementation wraps `D::Ok` into an [`Option`].
/// This makes it impossible to wrap a filtering drain into a [`Logger`].
///
/// [`LevelFilter`]: slog/struct.LevelFilter.html
/// [`Logger`]: slog/struct.Logger.html
/// [`Option`]: core/option/enum.Option.html
#[derive(Debug, Clone)]
struct LevelFilter<D: Drain>(pub D, pub ::slog::Level);

impl<D: Drain> Drain for LevelFilter<D> {
    type Ok = ();
    type Err = D::Err;
    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        if record.level().is_at_least(self.1) {
            self.0.log(record, logger_values)?;
        }
        Ok(())
    }
}

/// Converts a [`Drain`] into a [`Logger`] setting global tags.
///
/// [`Drain`]: slog/trait.Drain.html
/// [`Logger`]: slog/struct.Logger.html
fn into_logger<D>(drain: D) -> Logger
where
    D: SendSyncUnwindSafeDrain<Ok = (), Err = Never>,
    D: 'static + SendSyncRefUnwindSafeDrain<Err = Never, Ok = ()>,
{
    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Optionally wrap the drain into an [`Async`] drain.
///
/// [`Async`]: slog_async/struct.Async.html
fn config_async<D>(async_flush: bool, drain: D) -> Logger
where
    D: SendSyncUnwindSafeDrain<Ok = (), Err = Never>,
    D: 'static + SendSyncRefUnwindSafeDrain<Err = Never, Ok = ()>,
{
    match async_flush {
        true => into_logger(Async::new(drain).build().ignore_res()),
        false => into_logger(drain),
    }
}

/// Creates a [`Logger`] based on the given configuration.
///
/// [`Logger`]: slog/struct.Logger.html
pub fn configure(config: Config) -> Logger {
    let level = config.level.into();
    match config.drain {
        LoggingDrain::Json => {
            let drain = Mutex::new(Json::default(stdout())).map(IgnoreResult::new);
            config_async(config.async_flush, LevelFilter(drain, level))
        }
        LoggingDrain::Term => {
            let decorator = TermDecorator::new().stdout().build();
            let drain = FullFormat::new(decorator).build();
            let drain = Mutex::new(drain).map(IgnoreResult::new);
            config_async(config.async_flush, LevelFilter(drain, level))
        }
    }
}

/// Creates a fixed [`Logger`] to be used until configuration is loaded.
///
/// [`Logger`]: slog/struct.Logger.html
pub fn starter() -> Logger {
    let drain = Mutex::new(Json::default(stdout())).map(IgnoreResult::new);
    into_logger(drain)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use slog::info;

    use super::configure;
    use super::Config;
    use super::LoggingDrain;
    use super::LoggingLevel;

    #[test]
    fn defaults() {
        let config: Config = serde_yaml::from_reader(Cursor::new("{}")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.async_flush);
        assert_eq!(config.drain, LoggingDrain::Json);
        assert_eq!(config.level, LoggingLevel::Info);
    }

    #[test]
    fn parse_options() {
        let yaml = "{async: false, drain: term, level: debug}";
        let config: Config = serde_yaml::from_reader(Cursor::new(yaml)).unwrap();
        assert!(!config.async_flush);
        assert_eq!(config.drain, LoggingDrain::Term);
        assert_eq!(config.level, LoggingLevel::Debug);
    }

    #[test]
    fn configure_sync_json() {
        let config = Config {
            async_flush: false,
            drain: LoggingDrain::Json,
            level: LoggingLevel::Critical,
        };
        let logger = configure(config);
        info!(logger, "Filtered out by level");
    }

    #[test]
    fn configure_async_drains() {
        for drain in [LoggingDrain::Json, LoggingDrain::Term] {
            let config = Config {
                async_flush: true,
                drain,
                level: LoggingLevel::Critical,
            };
            let logger = configure(config);
            info!(logger, "Filtered out by level");
        }
    }
}
