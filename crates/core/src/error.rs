//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid package type: {0}")]
    InvalidPackageType(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid alias: {0}")]
    InvalidAlias(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("manifest integrity error: {0}")]
    ManifestIntegrity(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
