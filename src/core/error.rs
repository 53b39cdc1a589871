use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Check-in not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

impl CoreError {
    /// Field-level messages for a validation failure, empty otherwise
    pub fn field_errors(&self) -> &[String] {
        match self {
            CoreError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
