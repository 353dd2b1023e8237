//! Error handling module
//!
//! Provides the unified error taxonomy for the entire tool.

use thiserror::Error;

/// Tool-wide error type
#[derive(Error, Debug)]
pub enum SnapError {
    /// A required statistics source or connection setting is missing.
    /// Fatal, no fallback.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The reset call was rejected or not acknowledged, usually due to
    /// insufficient privilege or the wrong target database.
    #[error("Permission or scope error: {0}")]
    PermissionOrScope(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// External interrupt during the sampling wait or a query round-trip.
    /// Reported as "Terminated.", not as an internal failure.
    #[error("terminated")]
    Cancelled,
}

/// Result type alias for the snapshot pipeline
pub type SnapResult<T> = Result<T, SnapError>;

/// Helper function to create a configuration error
pub fn configuration_error(msg: impl Into<String>) -> SnapError {
    SnapError::Configuration(msg.into())
}

/// Helper function to create a permission/scope error
pub fn permission_error(msg: impl Into<String>) -> SnapError {
    SnapError::PermissionOrScope(msg.into())
}
