//! HTTP Price Oracle
//!
//! Thin client for a Jupiter-style price endpoint: one GET per lookup,
//! returning a map of address -> price. Retries and rate limiting are the
//! service's problem; a failed lookup surfaces as a transient error and the
//! affected token is retried on the next pass.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::price::{OracleError, PriceOracle};

#[derive(Debug, Clone)]
pub struct HttpPriceOracle {
    http: Client,
    base_url: String,
}

impl HttpPriceOracle {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OracleError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OracleError::InvalidParameters(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: HashMap<String, PriceData>,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    price: f64,
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn price(&self, address: &str) -> Result<f64, OracleError> {
        let url = format!("{}/price?ids={}", self.base_url, address);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| OracleError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OracleError::ApiError(format!(
                "price endpoint returned {}",
                response.status()
            )));
        }

        let parsed: PriceResponse = response
            .json()
            .await
            .map_err(|e| OracleError::ApiError(e.to_string()))?;

        parsed
            .data
            .get(address)
            .map(|p| p.price)
            .ok_or_else(|| OracleError::PriceUnavailable(address.to_string()))
    }
}
