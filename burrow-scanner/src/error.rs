use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Maps a reqwest failure, keeping timeouts and unusable URLs
    /// distinguishable from other network errors.
    pub fn from_request(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ScanError::Timeout(url.to_string())
        } else if error.is_builder() {
            ScanError::InvalidUrl(format!("{}: {}", url, error))
        } else {
            ScanError::HttpError(error)
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
