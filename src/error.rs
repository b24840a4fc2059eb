use thiserror::Error;

use crate::construct::Access;
use crate::datatype::ValueKind;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Key '{0}' not found")]
    KeyNotFound(String),
    #[error("Key '{0}' already exists")]
    DuplicateKey(String),
    #[error("{0} password mismatch")]
    Unauthorized(Access),
    #[error("Type enforcement: {kind} does not accept {given}")]
    TypeEnforcement { kind: ValueKind, given: String },
    #[error("Conversion error: cannot convert {given} to {kind}: {message}")]
    Conversion { kind: ValueKind, given: String, message: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RepoError>;

// Helper conversions
impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse {
            message: e.to_string(),
            line: Some(e.line()),
            col: Some(e.column()),
        }
    }
}
impl From<config::ConfigError> for RepoError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
