use crate::{config::ConfigError, semantic::CorpusError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
