use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeLockError {
    /// The target path, or an ancestor/descendant of it, holds an active lock.
    #[error("tree is locked at '{path}'")]
    LockedTree { path: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The lock store failed to respond. Distinct from a conflict and safe to
    /// retry once the store recovers.
    #[error("lock store unavailable: {details}")]
    StoreUnavailable { details: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TreeLockError>;

pub fn get_exit_code(error: &TreeLockError) -> i32 {
    match error {
        TreeLockError::InvalidArgument(_) | TreeLockError::ConfigError(_) => 2,

        TreeLockError::LockedTree { .. } => 4,

        TreeLockError::StoreUnavailable { .. } => 6,

        _ => 1,
    }
}
