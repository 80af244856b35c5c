use thiserror::Error;

/// Failures at the boundary with the remote timeline and geocoding services.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("authentication rejected ({status}): {body}")]
    Authentication { status: u16, body: String },
    #[error("rate limited by the remote API")]
    RateLimited,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("place not found: {0}")]
    GeocodeNotFound(String),
    #[error("malformed post: {0}")]
    MalformedPost(String),
    #[error("could not sign request: {0}")]
    Signing(String),
}

impl FeedError {
    /// Map a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => FeedError::Authentication {
                status: status.as_u16(),
                body,
            },
            429 => FeedError::RateLimited,
            code => FeedError::Api { status: code, body },
        }
    }
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;
