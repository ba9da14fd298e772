use thiserror::Error;

/// Main error type for Reposcope operations
#[derive(Error, Debug)]
pub enum ReposcopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Malformed manifest {path}: {reason}")]
    Manifest { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ReposcopeError>;
