//! HTTP Trade Executor
//!
//! Posts buy/sell orders to a swap-service endpoint and returns the
//! transaction id it reports. The signing secret travels in a header; this
//! adapter never persists it. Idempotency of retried orders is the
//! service's contract, not ours.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ports::execution::{ExecutorError, TradeExecutor};

#[derive(Debug, Clone)]
pub struct HttpTradeExecutor {
    http: Client,
    base_url: String,
}

impl HttpTradeExecutor {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExecutorError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExecutorError::InvalidParameters(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn submit(
        &self,
        side: &str,
        address: &str,
        amount: f64,
        secret: &str,
    ) -> Result<String, ExecutorError> {
        let url = format!("{}/{}", self.base_url, side);
        let request = OrderRequest {
            address: address.to_string(),
            amount,
        };

        let response = self
            .http
            .post(&url)
            .header("x-signer-secret", secret)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutorError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Rejected(format!("{}: {}", status, body)));
        }

        let parsed: OrderResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::ApiError(e.to_string()))?;
        Ok(parsed.tx_id)
    }
}

#[derive(Debug, Serialize)]
struct OrderRequest {
    address: String,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    tx_id: String,
}

#[async_trait]
impl TradeExecutor for HttpTradeExecutor {
    async fn buy(
        &self,
        address: &str,
        amount: f64,
        secret: &str,
    ) -> Result<String, ExecutorError> {
        self.submit("buy", address, amount, secret).await
    }

    async fn sell(
        &self,
        address: &str,
        amount: f64,
        secret: &str,
    ) -> Result<String, ExecutorError> {
        self.submit("sell", address, amount, secret).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_response_shape() {
        let json = r#"{"tx_id": "5KtP..."}"#;
        let parsed: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tx_id, "5KtP...");
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpTradeExecutor::new("https://swap.example.com/v1").is_ok());
    }
}
