use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use failure::ResultExt;
use serde::Deserialize;
use serde::Serialize;

use super::logging::Config as LoggingConfig;
use super::path;
use super::ErrorKind;
use super::Result;

/// Process configuration options.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Startup self-test options.
    #[serde(default)]
    pub self_test: SelfTestConfig,

    /// Zookeeper session options.
    pub zookeeper: ZookeeperConfig,
}

impl Config {
    /// Loads the configuration from the given [`std::fs::File`].
    ///
    /// [`std::fs::File`]: https://doc.rust-lang.org/std/fs/struct.File.html
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let config = File::open(path).with_context(|_| ErrorKind::ConfigLoad)?;
        Config::from_reader(config)
    }

    /// Loads the configuration from the given [`std::io::Read`].
    ///
    /// [`std::io::Read`]: https://doc.rust-lang.org/std/io/trait.Read.html
    pub fn from_reader<R: Read>(reader: R) -> Result<Config> {
        let conf: Config = serde_yaml::from_reader(reader).with_context(|_| ErrorKind::ConfigLoad)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Check values that parse correctly but can't be used.
    fn validate(&self) -> Result<()> {
        if self.zookeeper.address.trim().is_empty() {
            return Err(ErrorKind::ConfigInvalid("zookeeper.address must not be empty").into());
        }
        if self.zookeeper.timeout == 0 {
            return Err(ErrorKind::ConfigInvalid("zookeeper.timeout must be greater than 0").into());
        }
        if self.zookeeper.connect_timeout == Some(0) {
            return Err(
                ErrorKind::ConfigInvalid("zookeeper.connect_timeout must be greater than 0").into(),
            );
        }
        if path::validate(&self.self_test.path).is_err() || self.self_test.path == "/" {
            return Err(ErrorKind::ConfigInvalid("self_test.path is not a valid node path").into());
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn mock() -> Config {
        Config::from_reader(include_str!("mock_config.yaml").as_bytes())
            .expect("mock config to load")
    }
}

/// Zookeeper session configuration options.
///
/// There are no defaults for the ensemble address and session timeout:
/// both must be provided by the operator.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ZookeeperConfig {
    /// Zookeeper ensemble connection string (`host:port[,host:port...][/chroot]`).
    pub address: String,

    /// Zookeeper session timeout (in milliseconds).
    pub timeout: u64,

    /// Maximum time to wait for the session to connect at startup (in milliseconds).
    ///
    /// Defaults to the session timeout.
    #[serde(default)]
    pub connect_timeout: Option<u64>,
}

impl ZookeeperConfig {
    /// Time to wait for the initial connection handshake.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout.unwrap_or(self.timeout))
    }
}

/// Startup self-test configuration options.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct SelfTestConfig {
    /// Run the self-test when the process starts.
    #[serde(default = "SelfTestConfig::default_enabled")]
    pub enabled: bool,

    /// Node created, read back and deleted by the self-test.
    #[serde(default = "SelfTestConfig::default_path")]
    pub path: String,

    /// Data stored in the self-test node.
    #[serde(default = "SelfTestConfig::default_data")]
    pub data: String,
}

impl Default for SelfTestConfig {
    fn default() -> SelfTestConfig {
        SelfTestConfig {
            enabled: SelfTestConfig::default_enabled(),
            path: SelfTestConfig::default_path(),
            data: SelfTestConfig::default_data(),
        }
    }
}

impl SelfTestConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_path() -> String {
        "/kiss2".into()
    }

    fn default_data() -> String {
        "test".into()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use super::Config;
    use crate::ErrorKind;

    fn load_error(yaml: &'static str) -> ErrorKind {
        match Config::from_reader(Cursor::new(yaml)) {
            Err(error) => error.kind().clone(),
            Ok(_) => panic!("Unexpected success!"),
        }
    }

    #[test]
    fn from_reader_error() {
        assert_eq!(load_error("some other text"), ErrorKind::ConfigLoad);
    }

    #[test]
    fn zookeeper_settings_are_required() {
        assert_eq!(load_error("{}"), ErrorKind::ConfigLoad);
        assert_eq!(
            load_error("zookeeper: {address: 'localhost:2181'}"),
            ErrorKind::ConfigLoad
        );
    }

    #[test]
    fn from_reader_ok() {
        let config = Config::mock();
        assert_eq!(config.zookeeper.address, "localhost:2181");
        assert_eq!(config.zookeeper.timeout, 10000);
        assert_eq!(config.zookeeper.connect_timeout(), Duration::from_millis(10000));
        assert!(config.self_test.enabled);
        assert_eq!(config.self_test.path, "/kiss2");
        assert_eq!(config.self_test.data, "test");
    }

    #[test]
    fn connect_timeout_override() {
        let cursor = Cursor::new(
            "zookeeper: {address: 'zk1:2181,zk2:2181', timeout: 6000, connect_timeout: 500}",
        );
        let config = Config::from_reader(cursor).unwrap();
        assert_eq!(config.zookeeper.connect_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            load_error("zookeeper: {address: '', timeout: 100}"),
            ErrorKind::ConfigInvalid("zookeeper.address must not be empty"),
        );
        assert_eq!(
            load_error("zookeeper: {address: 'zk:2181', timeout: 0}"),
            ErrorKind::ConfigInvalid("zookeeper.timeout must be greater than 0"),
        );
        assert_eq!(
            load_error("{zookeeper: {address: 'zk:2181', timeout: 10}, self_test: {path: 'nope'}}"),
            ErrorKind::ConfigInvalid("self_test.path is not a valid node path"),
        );
    }
}
