use thiserror::Error;

/// Failure taxonomy for the assistant core.
///
/// Unresolvable unit conversions are deliberately not represented here: the
/// converter degrades by returning the ingredient unchanged and logs a soft
/// failure instead of erroring.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or missing required input (non-positive scale factor,
    /// recipe payload with no ingredients, unknown session id on a mutating
    /// call). Surfaced immediately, nothing is mutated.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A lookup found nothing (no active recipe, no ingredient matching the
    /// query). Session state is left unchanged.
    #[error("not found: {0}")]
    NotFound(String),

    /// A collaborator call (chat model, transcription, ingestion) failed.
    /// No speculative state mutation happens before a successful response.
    #[error("external service failure: {0}")]
    ExternalService(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn external(err: impl std::fmt::Display) -> Self {
        CoreError::ExternalService(err.to_string())
    }
}
