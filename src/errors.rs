use thiserror::Error;

use crate::addr::Addr;

pub type Result<T> = std::result::Result<T, ScriptError>;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Debuggee must be stopped to execute this command: {0}")]
    InvalidState(String),
    #[error("Could not resolve symbols: {0}")]
    ResolutionFailure(String),
    #[error("Unknown hardware: {0}")]
    UnsupportedArchitecture(String),
    #[error("No symbol contains the address {0}")]
    UnknownAddress(Addr),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Usage(String),
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not (de)serialize json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
    #[cfg(feature = "cli")]
    #[error("Could not read from the terminal: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}
