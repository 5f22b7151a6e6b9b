//! Extraction error types.

use thiserror::Error;

/// Errors from product extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The submitted URL cannot be extracted from.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Network failure talking to the retailer.
    #[error("failed to fetch page: {0}")]
    Fetch(String),

    /// Retailer answered with a non-success status.
    #[error("page returned status {0}")]
    UpstreamStatus(u16),

    /// Page body exceeded the size limit.
    #[error("page exceeds {0} bytes")]
    TooLarge(usize),

    /// LLM request failed or returned something unusable.
    #[error("llm error: {0}")]
    Llm(String),

    /// Bulk import was given too many or no URLs.
    #[error("import accepts between 1 and {max} urls, got {got}")]
    BatchSize { max: usize, got: usize },
}

impl ExtractionError {
    /// Whether the failure was on the retailer's side rather than the input.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::UpstreamStatus(_) | Self::TooLarge(_) | Self::Llm(_)
        )
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Fetch("request timed out".to_string())
        } else {
            Self::Fetch(err.to_string())
        }
    }
}
