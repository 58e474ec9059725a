use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown param format: {0}")]
    UnknownFormat(String),

    #[error("invalid value for param '{param}': {reason}")]
    InvalidParam { param: String, reason: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
