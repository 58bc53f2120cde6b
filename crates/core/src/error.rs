use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
