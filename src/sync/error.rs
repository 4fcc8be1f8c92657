//! Error types for backend synchronisation.

use thiserror::Error;

use crate::model::AnnotationId;
use crate::store::LocalKey;
use crate::wire::WireError;

/// Errors reported by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Request never reached the backend or the connection dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Backend refused the request
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP-like status code
        status: u16,
        /// Backend-provided reason
        message: String,
    },

    /// No annotation with this id
    #[error("Annotation {0} not found")]
    NotFound(AnnotationId),
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Errors from persisting, removing or reloading annotations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No image is selected, so there is nothing to attach annotations to
    #[error("No image selected")]
    NoImage,

    /// The local key does not name an entry in the store
    #[error("Unknown annotation entry {0}")]
    UnknownEntry(LocalKey),

    /// The entry already has a backend id
    #[error("Annotation entry {0} is already confirmed")]
    AlreadyConfirmed(LocalKey),

    /// A create for this entry is already waiting on the backend
    #[error("Annotation entry {0} is already being saved")]
    AlreadyInFlight(LocalKey),

    /// The annotation could not be encoded for the backend
    #[error("Encoding error: {0}")]
    Wire(#[from] WireError),

    /// The backend request failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
