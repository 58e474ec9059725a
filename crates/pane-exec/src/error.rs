use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid {what} name: {name:?}")]
    InvalidName { what: &'static str, name: String },

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
