use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid severity '{0}': must be critical, medium, or low")]
    InvalidSeverity(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LearnError>;
