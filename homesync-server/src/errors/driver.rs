use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("Device call failed: {0}")]
    Failed(String),

    #[error("Device call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Driver {driver} does not support {operation}")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        DriverError::Transport(e.to_string())
    }
}
