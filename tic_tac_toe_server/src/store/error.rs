use std::sync::PoisonError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    #[error("failed to open database at {path}: {source}")]
    Connection {
        path: String,
        #[source]
        source: diesel::ConnectionError,
    },
    #[error("failed to migrate database: {0}")]
    Migration(String),
    #[error("stored game is corrupt: {0}")]
    CorruptState(String),
    #[error("failed to lock store: {0}")]
    MutexPoison(String),
    #[error("store task did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptState(reason.into())
    }
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(value: PoisonError<T>) -> Self {
        Self::MutexPoison(value.to_string())
    }
}
