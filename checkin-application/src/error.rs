use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no event loaded")]
    NotLoaded,
    #[error("check-in worker stopped")]
    WorkerStopped,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
