use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("bad graph file: {0}")]
    Format(String),
    #[error("metadata error: {0}")]
    Metadata(#[from] rusqlite::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
}
