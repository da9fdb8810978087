use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Balance catalog not registered")]
    BalanceNotRegistered,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No snapshot stored for run '{run_id}'")]
    SnapshotNotFound { run_id: String },

    #[error("Unsupported state version {found}")]
    UnsupportedVersion { found: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
