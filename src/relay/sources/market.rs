// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adk::error::SourceError;

const SOURCE: &str = "market data";

/// Latest quote for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: String,
    pub pe_ratio: f64,
    #[serde(rename = "52_week_high")]
    pub week_52_high: f64,
    #[serde(rename = "52_week_low")]
    pub week_52_low: f64,
}

/// Technical indicators for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub macd: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub signal: String,
}

impl TechnicalIndicators {
    /// RSI reading: overbought above 70, oversold below 30
    pub fn rsi_label(&self) -> &'static str {
        if self.rsi > 70.0 {
            "overbought"
        } else if self.rsi < 30.0 {
            "oversold"
        } else {
            "neutral"
        }
    }
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Quote, SourceError>;

    async fn indicators(&self, ticker: &str) -> Result<TechnicalIndicators, SourceError>;

    /// Broad market regime, e.g. `bullish`
    async fn market_conditions(&self) -> Result<String, SourceError>;
}

/// Fixed figures for any non-empty ticker
#[derive(Debug, Clone, Default)]
pub struct MockMarketData;

fn check_ticker(ticker: &str) -> Result<&str, SourceError> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(SourceError::not_found(SOURCE, ticker));
    }
    Ok(ticker)
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn quote(&self, ticker: &str) -> Result<Quote, SourceError> {
        let ticker = check_ticker(ticker)?;
        log::debug!("Fetching mock quote for {}", ticker);
        Ok(Quote {
            ticker: ticker.to_string(),
            price: 150.25,
            change: 2.5,
            change_percent: 1.69,
            volume: 1_250_000,
            market_cap: "2.5T".to_string(),
            pe_ratio: 28.5,
            week_52_high: 180.0,
            week_52_low: 120.0,
        })
    }

    async fn indicators(&self, ticker: &str) -> Result<TechnicalIndicators, SourceError> {
        check_ticker(ticker)?;
        Ok(TechnicalIndicators {
            rsi: 65.5,
            macd: 1.25,
            sma_50: 145.0,
            sma_200: 140.0,
            signal: "bullish".to_string(),
        })
    }

    async fn market_conditions(&self) -> Result<String, SourceError> {
        Ok("bullish".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_quote() {
        let quote = MockMarketData.quote(" AAPL ").await.unwrap();
        assert_eq!(quote.ticker, "AAPL");
        assert_eq!(quote.price, 150.25);

        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(value["52_week_high"], json!(180.0));
    }

    #[tokio::test]
    async fn test_empty_ticker_not_found() {
        let err = MockMarketData.quote("  ").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn test_rsi_label() {
        let mut ind = TechnicalIndicators {
            rsi: 65.5,
            macd: 0.0,
            sma_50: 0.0,
            sma_200: 0.0,
            signal: "bullish".to_string(),
        };
        assert_eq!(ind.rsi_label(), "neutral");
        ind.rsi = 75.0;
        assert_eq!(ind.rsi_label(), "overbought");
        ind.rsi = 25.0;
        assert_eq!(ind.rsi_label(), "oversold");
    }
}
