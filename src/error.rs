//! Error types for the extraction workflow.

use thiserror::Error;

/// Result type alias using the crate error type.
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Raised by intake when a selection cannot become a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// None of the candidates declared an `image/*` media type.
    #[error("Please select valid image files.")]
    NoImages,
}

/// Raised when a submitted batch does not produce an extraction result.
///
/// Both variants are recoverable: the user may resubmit or pick a new selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Non-2xx status, an explicit `error` payload, or a response without a code list.
    #[error("{0}")]
    ServerRejected(String),

    /// Network or decoding failure before a usable response was read.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SubmissionError {
    /// Short message suitable for showing to the user.
    pub fn message(&self) -> &str {
        match self {
            SubmissionError::ServerRejected(message) => message,
            SubmissionError::Transport(cause) => cause,
        }
    }
}

/// Main error type for the extraction workflow.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The selection contained no usable images
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The service rejected the batch or could not be reached
    #[error("Processing error: {0}")]
    Submission(#[from] SubmissionError),

    /// A submission is already running; the call was ignored
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    /// Submit was requested with no selected images
    #[error("No images selected")]
    EmptyBatch,

    /// The workflow is in a state that does not allow the operation
    #[error("Invalid state transition: workflow is '{0}', cannot {1}")]
    InvalidState(&'static str, &'static str),

    /// Submission attempted without a signed-in user
    #[error("Sign in required")]
    Unauthenticated,

    /// Sign-in rejected by the credential verifier
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while reading images or writing exports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExtractorError {
    /// Normalize any error raised while talking to the service into a [`SubmissionError`].
    ///
    /// Application-level rejections pass through unchanged; everything else is a
    /// transport failure.
    pub fn into_submission_error(self) -> SubmissionError {
        match self {
            ExtractorError::Submission(e) => e,
            other => SubmissionError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_images_message_is_user_facing() {
        assert_eq!(
            ValidationError::NoImages.to_string(),
            "Please select valid image files."
        );
    }

    #[test]
    fn test_server_rejection_passes_through_normalization() {
        let err = ExtractorError::Submission(SubmissionError::ServerRejected("busy".into()));
        assert_eq!(
            err.into_submission_error(),
            SubmissionError::ServerRejected("busy".into())
        );
    }

    #[test]
    fn test_other_errors_normalize_to_transport() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let normalized = ExtractorError::from(json_err).into_submission_error();
        match normalized {
            SubmissionError::Transport(cause) => assert!(cause.starts_with("Serialization error")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
