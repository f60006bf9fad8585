use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlattenError>;

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid corpus: {0}")]
    InvalidCorpus(String),
}
