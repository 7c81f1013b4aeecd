// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adk::error::SourceError;

/// Aggregated news sentiment for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentiment {
    /// -1 (negative) to 1 (positive)
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub news_count: u32,
    pub key_topics: Vec<String>,
}

impl NewsSentiment {
    pub fn interpretation(&self) -> &'static str {
        if self.sentiment_score > 0.5 {
            "Strong positive sentiment suggests bullish market perception."
        } else if self.sentiment_score < -0.5 {
            "Negative sentiment indicates bearish market perception."
        } else {
            "Neutral sentiment suggests market uncertainty."
        }
    }
}

#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn news_sentiment(&self, ticker: &str) -> Result<NewsSentiment, SourceError>;
}

#[derive(Debug, Clone, Default)]
pub struct MockSentiment;

#[async_trait]
impl SentimentSource for MockSentiment {
    async fn news_sentiment(&self, ticker: &str) -> Result<NewsSentiment, SourceError> {
        if ticker.trim().is_empty() {
            return Err(SourceError::not_found("news sentiment", ticker));
        }
        Ok(NewsSentiment {
            sentiment_score: 0.75,
            sentiment_label: "positive".to_string(),
            news_count: 15,
            key_topics: vec![
                "earnings".to_string(),
                "product launch".to_string(),
                "market expansion".to_string(),
            ],
        })
    }
}
