use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("API request failed: {0}")]
    ApiError(String),
    #[error("No price available for {0}")]
    PriceUnavailable(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// External price feed. Accuracy and transport reliability are the
/// collaborator's responsibility; the engine only distinguishes success
/// from failure.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price(&self, address: &str) -> Result<f64, OracleError>;
}
