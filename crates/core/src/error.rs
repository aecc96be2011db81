use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A password-reset token that is unknown, already used, or expired.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// `page` was supplied explicitly but skips past every matching document.
    #[error("Page {page} does not exist")]
    PageOutOfRange { page: u64 },

    /// An external collaborator (notifier, payment provider) failed or timed out.
    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(msg) => CoreError::Conflict(msg),
            StoreError::InvalidQuery(msg) => CoreError::Validation(msg),
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
