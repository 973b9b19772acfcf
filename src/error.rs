use std::path::PathBuf;

use thiserror::Error;

/// Problems detected before anything is loaded. All of them end with the
/// usage text on stdout and exit code 1.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandLineError {
    #[error("no options given")]
    UsageRequested,
    #[error("{0}")]
    Parse(String),
    #[error("Bad argument value for option {0}")]
    BadArgumentValue(char),
}

impl CommandLineError {
    /// Line printed ahead of the usage text, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            CommandLineError::UsageRequested => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum DataLoadingError {
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
    #[error("configuration error")]
    ConfigError(#[from] config::ConfigError),
    #[error("could not resolve {0}")]
    UnresolvedAddress(String),
    #[error("timed out after {seconds}s connecting to {address}")]
    ConnectTimeout { address: String, seconds: u64 },
    #[error("dataset {0:?} is empty")]
    EmptyDataSet(PathBuf),
}
