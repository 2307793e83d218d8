use thiserror::Error;

/// Failures of the durable key-value slot.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("No task ids left")]
    IdsExhausted,
}

impl StorageError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        StorageError::Unavailable(msg.into())
    }
}
