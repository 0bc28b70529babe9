//! Application-level errors

use networking::NetworkError;
use storage::EntityKind;
use thiserror::Error;

/// Errors surfaced by the application services
#[derive(Debug, Error)]
pub enum AppError {
    /// A remote operation failed, including a response that is not the
    /// expected entity
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Offline and nothing cached
    #[error("{kind} {id} is not available offline")]
    Unavailable {
        /// Entity kind requested
        kind: EntityKind,
        /// Entity id requested
        id: i64,
    },
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;
