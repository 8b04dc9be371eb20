//! Error module
//!
//! Everything that can go wrong during a run ends up as a `FetchError`, which knows which
//! process exit code it maps to.
//!

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Errors from the configuration layer, always folded into `FetchError::Logic`.
///
#[derive(Error, Debug)]
pub enum Status {
    #[error("Bad file version {0}")]
    BadFileVersion(usize),
    #[error("Missing configuration file {0}")]
    MissingConfig(String),
    #[error("Error reading configuration({0})")]
    MissingConfigParameter(String),
    #[error("Unknown authentication method {0}")]
    UnknownAuthMethod(String),
}

/// The two failure kinds of the HTTP exchange, plus the output sink.
///
#[derive(Error, Debug)]
pub enum FetchError {
    /// Anything arising from executing the network exchange itself.
    #[error("{0}")]
    Runtime(String),
    /// Invalid configuration of the request, before or during execution.
    #[error("{0}")]
    Logic(String),
    /// Opening, writing or flushing the output sink.
    #[error("{}: {}", .path.display(), .source)]
    Sink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub fn runtime(msg: impl Into<String>) -> Self {
        FetchError::Runtime(msg.into())
    }

    pub fn logic(msg: impl Into<String>) -> Self {
        FetchError::Logic(msg.into())
    }

    pub fn sink(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Sink {
            path: path.into(),
            source,
        }
    }

    /// Numeric process exit code.
    ///
    pub fn code(&self) -> u8 {
        match self {
            FetchError::Runtime(_) => 1,
            FetchError::Logic(_) => 2,
            FetchError::Sink { .. } => 3,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Builder errors come from a bad URL or header value, i.e. misuse of the client.  Everything
/// else happened on the wire.
///
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            FetchError::Logic(e.to_string())
        } else {
            FetchError::Runtime(e.to_string())
        }
    }
}

impl From<Status> for FetchError {
    fn from(e: Status) -> Self {
        FetchError::Logic(e.to_string())
    }
}

impl From<eyre::Report> for FetchError {
    fn from(e: eyre::Report) -> Self {
        FetchError::Logic(format!("{e:#}"))
    }
}
