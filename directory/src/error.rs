use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Network, authentication or vendor-side failure. Safe to retry.
    #[error("Supporter directory unavailable: {0}")]
    Unavailable(String),

    /// The vendor refused the payload. Retrying the same data will fail again.
    #[error("{0}")]
    ValidationRejected(String),
}

impl DirectoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            DirectoryError::Unavailable(format!("request timed out: {}", error))
        } else {
            DirectoryError::Unavailable(error.to_string())
        }
    }
}
