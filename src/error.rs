//! Error handling module for enrollkit
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every fallible store or tracker action returns these types, and the screen
//! layer turns them into text with [`EnrollError::user_message`].

use thiserror::Error;

use crate::enrollment_state::AdvanceError;

/// Main error type for enrollkit
#[derive(Error, Debug)]
pub enum EnrollError {
    /// IO errors (state file, proof archive, snapshot directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Durable local storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote enrollment service errors (fetch, track)
    #[error("Remote error: {0}")]
    Remote(String),

    /// Payment proof upload errors
    #[error("Upload error: {0}")]
    Upload(String),

    /// A remote snapshot carried values outside the known step range
    #[error("Invalid enrollment snapshot: {0}")]
    InvalidSnapshot(String),

    /// No enrollment id is known yet
    #[error("No enrollment id is known")]
    MissingEnrollmentId,

    /// Upload requested without a pending local proof file
    #[error("No payment proof file is attached")]
    MissingProofAttachment,

    /// A payment proof upload is already running
    #[error("A payment proof upload is already in progress")]
    UploadInFlight,

    /// Local step transition refused
    #[error("Transition error: {0}")]
    Transition(#[from] AdvanceError),

    /// State errors (lock poisoning)
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for enrollkit operations
pub type Result<T> = std::result::Result<T, EnrollError>;

// Convenient error constructors
impl EnrollError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a remote service error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create an upload error
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Message suitable for showing to the person using the app.
    ///
    /// Internal detail (paths, serde positions) stays in the `Display` output
    /// and in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io(_) | Self::Storage(_) => {
                "Could not read or save your enrollment on this device.".to_string()
            }
            Self::Json(_) | Self::InvalidSnapshot(_) => {
                "The enrollment record could not be understood. Please try again later.".to_string()
            }
            Self::Remote(_) => {
                "Could not reach the enrollment service. Check your connection and try again."
                    .to_string()
            }
            Self::Upload(_) => "Failed to upload proof of payment. Please try again.".to_string(),
            Self::MissingEnrollmentId => {
                "No enrollment found. Submit or track an enrollment first.".to_string()
            }
            Self::MissingProofAttachment => {
                "Please choose a proof of payment file first.".to_string()
            }
            Self::UploadInFlight => "Your proof of payment is still uploading.".to_string(),
            Self::Transition(err) => err.user_message().to_string(),
            Self::State(_) => {
                "Something went wrong. Please restart the app.".to_string()
            }
        }
    }
}
