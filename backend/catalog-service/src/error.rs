use catalog_store::{SchemaError, StoreError};
use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Category lookup failed: {0}")]
    Category(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SchemaError> for ServiceError {
    fn from(err: SchemaError) -> Self {
        ServiceError::Store(StoreError::from(err))
    }
}

impl ServiceError {
    /// Caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Store(err) => err.is_client_error(),
            ServiceError::NotFound(_) | ServiceError::InvalidRequest(_) => true,
            ServiceError::Category(_) | ServiceError::Config(_) => false,
        }
    }
}
