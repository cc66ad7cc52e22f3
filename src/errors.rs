use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("url not present in pending queue: {0}")]
    QueueInconsistency(String),
    #[error("{0}")]
    Config(String),
}
