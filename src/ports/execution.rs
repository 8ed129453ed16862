use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("API request failed: {0}")]
    ApiError(String),
    #[error("Transaction signing failed: {0}")]
    SigningError(String),
    #[error("Trade rejected: {0}")]
    Rejected(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// External trade execution. Idempotency of retried attempts is the
/// executor's responsibility; the engine does not deduplicate trades.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Buy `amount` of the base currency worth of `address`, returning the
    /// transaction id.
    async fn buy(&self, address: &str, amount: f64, secret: &str)
        -> Result<String, ExecutorError>;

    /// Sell `amount` of `address`, returning the transaction id.
    async fn sell(&self, address: &str, amount: f64, secret: &str)
        -> Result<String, ExecutorError>;
}
