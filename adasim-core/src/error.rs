use thiserror::Error;

/// Error taxonomy for the ingestion and delivery pipeline.
///
/// Per-record rejections during bulk insert are not errors; they are
/// reported through [`crate::store::BulkOutcome`] and logged.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authorization error: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The detector call failed or returned an unusable payload. The
    /// affected run has already been marked `failed` when this surfaces.
    #[error("upstream processing error: {0}")]
    UpstreamProcessing(String),

    /// Unexpected storage failure unrelated to per-record validation.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamProcessing(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
