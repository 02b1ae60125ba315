//! Error types for registry operations.

use depot_storage::StorageError;
use thiserror::Error;

/// Registry error type.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{what} exceeds the {limit} byte limit")]
    PayloadTooLarge { what: String, limit: u64 },

    #[error(transparent)]
    Core(#[from] depot_core::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Classification of a [`RegistryError`] for callers that map errors to
/// protocol responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    PayloadTooLarge,
    Internal,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            // Stored documents that no longer parse
            Self::Core(depot_core::Error::Serialization(_))
            | Self::Core(depot_core::Error::ManifestIntegrity(_)) => ErrorKind::Internal,
            Self::Core(_) => ErrorKind::BadRequest,
            Self::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            Self::Storage(StorageError::InvalidKey(_)) => ErrorKind::BadRequest,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            RegistryError::Conflict("x".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            RegistryError::from(depot_core::Error::InvalidName("..".into())).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            RegistryError::from(depot_core::Error::Serialization("eof".into())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            RegistryError::from(StorageError::NotFound("k".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RegistryError::from(StorageError::Backend("disk full".into())).kind(),
            ErrorKind::Internal
        );
    }
}
