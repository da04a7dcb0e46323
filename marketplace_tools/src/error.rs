use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketplaceApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request failed before a response was received: {0}")]
    RequestError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("The response contained no data")]
    EmptyResponse,
    #[error("Invalid currency amount: {0}")]
    InvalidAmount(String),
}

impl MarketplaceApiError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::RequestError(e.to_string())
        }
    }

    /// Transient failures worth retrying with backoff: rate limits, brief unavailability,
    /// timeouts and connection drops. Everything else fails immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RequestError(_) => true,
            Self::QueryError { status, .. } => matches!(status, 429 | 503),
            _ => false,
        }
    }
}
