use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out.")]
    Timeout,
    #[error("{message}")]
    Request { message: String },
    #[error("Failed to read response body: {message}")]
    Body { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                message: err.to_string(),
            }
        }
    }
}
