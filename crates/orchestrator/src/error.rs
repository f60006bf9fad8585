use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Missing directory: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Jobs '{first}' and '{second}' both write {}", path.display())]
    DuplicateOutput {
        first: String,
        second: String,
        path: PathBuf,
    },
}
