use std::fmt;

use failure::Backtrace;
use failure::Context;
use failure::Fail;

/// Error information returned by functions in case of errors.
#[derive(Debug)]
pub struct Error(Context<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.get_context()
    }

    /// Check if the error was caused by a missing node.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NodeNotFound(_))
    }
}

impl Fail for Error {
    fn backtrace(&self) -> Option<&Backtrace> {
        self.0.backtrace()
    }

    fn cause(&self) -> Option<&dyn Fail> {
        self.0.cause()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Error {
        Error(inner)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error(Context::new(kind))
    }
}

/// Exhaustive list of possible errors emitted by this crate.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "could not load configuration")]
    ConfigLoad,

    #[fail(display = "invalid configuration: {}", _0)]
    ConfigInvalid(&'static str),

    #[fail(display = "connection to zookeeper failed")]
    Connect,

    #[fail(display = "zookeeper session not established within {}ms", _0)]
    ConnectTimeout(u64),

    #[fail(display = "{} failed because the zookeeper connection was lost", _0)]
    ConnectionLost(&'static str),

    #[fail(display = "{} failed due to zookeeper error", _0)]
    Backend(&'static str),

    #[fail(display = "data at '{}' is not valid UTF-8", _0)]
    Decode(String),

    #[fail(display = "failed to encode {}", _0)]
    Encode(&'static str),

    #[fail(display = "invalid node path '{}': {}", _0, _1)]
    InvalidPath(String, &'static str),

    #[fail(display = "node '{}' already exists", _0)]
    NodeExists(String),

    #[fail(display = "node '{}' not found", _0)]
    NodeNotFound(String),

    #[fail(display = "node '{}' has children", _0)]
    NotEmpty(String),

    #[fail(display = "{} timed out", _0)]
    Timeout(&'static str),

    #[fail(display = "node '{}' version does not match the expected version", _0)]
    VersionConflict(String),
}

/// Short form alias for functions returning `Error`s.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Render an error and all its causes as a single message.
pub fn format_fail(fail: &dyn Fail) -> String {
    let mut message = fail.to_string();
    for cause in fail.iter_causes() {
        message.push_str(&format!("\n  caused by: {}", cause));
    }
    message
}
