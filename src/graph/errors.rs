use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read graph file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse graph file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid error route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid graph: {0}")]
    Invalid(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
