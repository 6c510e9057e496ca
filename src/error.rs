//! Error types for the laptop catalog service.

use tonic::Status;

/// Main error types for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A token's signature does not match its payload.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// A token could not be parsed or carries an unknown role.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// A token's expiration timestamp is not in the future.
    #[error("Token expired")]
    Expired,

    /// The caller's role is not permitted to invoke the method.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A record with the same identifier already exists.
    #[error("Record '{0}' already exists")]
    AlreadyExists(String),

    /// No record with the given identifier exists.
    #[error("Record '{0}' not found")]
    NotFound(String),

    /// A request violated the call's protocol sequence or carried bad data.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O failure while persisting an image.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidSignature | Error::MalformedToken(_) | Error::Expired => {
                Status::unauthenticated(err.to_string())
            }
            Error::PermissionDenied(_) => Status::permission_denied(err.to_string()),
            Error::AlreadyExists(_) => Status::already_exists(err.to_string()),
            Error::NotFound(_) => Status::not_found(err.to_string()),
            Error::InvalidArgument(_) => Status::invalid_argument(err.to_string()),
            Error::Io(_) | Error::Internal(_) => Status::internal(err.to_string()),
        }
    }
}

/// Result type alias using the library error.
pub type Result<T> = std::result::Result<T, Error>;
