use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Document too large: {0} bytes")]
    TooLarge(usize),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid storage URI: {0}")]
    InvalidUri(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;

/// Turn a non-2xx response into `RouterError::Status`, keeping the body for diagnostics.
pub(crate) fn ensure_success(
    service: &'static str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(RouterError::Status {
        service,
        status,
        body: body_or_placeholder(response.text()),
    })
}

// The status is the real error; a body that cannot be read is only noted.
fn body_or_placeholder<E>(body: std::result::Result<String, E>) -> String {
    body.unwrap_or_else(|_| "<unreadable body>".to_string())
}
