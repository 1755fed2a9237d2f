//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`PipelineError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`PipelineError`] as the error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for all crate errors.
///
/// # Example
///
/// ```rust
/// use candle_sentiment::error::PipelineError;
///
/// fn handle_error(e: PipelineError) {
///     match &e {
///         PipelineError::InputRejected(_) => {
///             // Blank text - reject at the boundary
///         }
///         PipelineError::Inference(_) => {
///             // Classifier failed for this request
///         }
///         PipelineError::Download(_) => {
///             // Network issue - retry with backoff
///         }
///         PipelineError::Device(_) => {
///             // GPU unavailable - fall back to CPU
///         }
///         _ => {
///             eprintln!("error: {e}");
///         }
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Input text was empty or whitespace only.
    #[error("{0}")]
    InputRejected(String),

    /// The classifier failed or returned malformed scores. Fails the whole request.
    #[error("{0}")]
    Inference(String),

    /// Network or download failure. Retry may help.
    #[error("{0}")]
    Download(String),

    /// Tokenization failure. Check input text.
    #[error("{0}")]
    Tokenization(String),

    /// Device initialization failure. Fall back to CPU.
    #[error("{0}")]
    Device(String),

    /// Invalid lexicon or calibration configuration.
    #[error("{0}")]
    Config(String),

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<hf_hub::api::sync::ApiError> for PipelineError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        PipelineError::Download(format!("HuggingFace API error: {}", value))
    }
}

impl From<candle_core::Error> for PipelineError {
    fn from(value: candle_core::Error) -> Self {
        PipelineError::Inference(value.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Config(value.to_string())
    }
}

impl From<regex::Error> for PipelineError {
    fn from(value: regex::Error) -> Self {
        PipelineError::Config(format!("Invalid lexicon phrase: {value}"))
    }
}
