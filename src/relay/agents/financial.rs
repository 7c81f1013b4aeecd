// SPDX-License-Identifier: MIT

//! Financial analysis: market data, news sentiment, narrative report
//!
//! The writer is the only worker that calls the narrative model. Its prompt
//! is built from the summaries the two data workers left in the transcript.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::group_thousands;
use crate::adk::error::WorkerFailure;
use crate::adk::model::{generate_text, Model};
use crate::adk::worker::{StateView, Worker, WorkerResult};
use crate::relay::sources::{MarketDataSource, SentimentSource, Sources};
use crate::relay::workflow::builder::GraphBuilder;
use crate::relay::workflow::graph::WorkerId;
use crate::relay::workflow::state::{FieldType, StateSchema};
use crate::relay::workflow::supervisor::RouteTable;

pub const NAME: &str = "financial_analysis";

pub const ANALYST_CONTEXT: &str =
    "You are a financial analyst providing investment recommendations.";

pub const DISCLAIMER: &str = "*This analysis is for informational purposes only and should not be considered financial advice.*";

worker_ids! {
    /// Workers of the financial analysis workflow
    pub enum Step {
        MarketData => "market_data",
        Sentiment => "sentiment",
        Writer => "writer",
    }
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .input("ticker", FieldType::String)
        .output("market_data", FieldType::Object)
        .output("sentiment_score", FieldType::Number)
        .output("final_report", FieldType::String)
}

pub fn route_table() -> RouteTable<Step> {
    RouteTable::new(NAME)
        .when_unset("market_data", Step::MarketData)
        .when_unset("sentiment_score", Step::Sentiment)
        .when_unset("final_report", Step::Writer)
}

pub fn builder(sources: &Sources, model: Arc<dyn Model>) -> GraphBuilder<Step> {
    GraphBuilder::new(NAME, schema())
        .routes(route_table())
        .worker(
            Step::MarketData,
            Arc::new(MarketDataWorker {
                market: sources.market.clone(),
            }),
        )
        .worker(
            Step::Sentiment,
            Arc::new(SentimentWorker {
                sentiment: sources.sentiment.clone(),
            }),
        )
        .worker(Step::Writer, Arc::new(WriterWorker { model }))
}

pub struct MarketDataWorker {
    market: Arc<dyn MarketDataSource>,
}

#[async_trait]
impl Worker for MarketDataWorker {
    fn name(&self) -> &str {
        "market_data"
    }

    fn reads(&self) -> &[&'static str] {
        &["ticker"]
    }

    fn writes(&self) -> &[&'static str] {
        &["market_data"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let ticker = state.require_str("ticker")?;
        let quote = self.market.quote(ticker).await?;
        let technical = self.market.indicators(ticker).await?;

        let summary = format!(
            "Market Data Analysis for {ticker}:\n\
             Price: ${price} ({change:+.2}%)\n\
             Volume: {volume}\n\
             Market Cap: {cap}\n\
             P/E Ratio: {pe}\n\
             Technical Indicators:\n\
             - RSI: {rsi} ({rsi_label})\n\
             - MACD: {macd} ({signal})\n\
             - 50-day SMA: ${sma50}\n\
             - 200-day SMA: ${sma200}\n\
             Technical Signal: {signal_upper}",
            ticker = ticker,
            price = quote.price,
            change = quote.change_percent,
            volume = group_thousands(quote.volume),
            cap = quote.market_cap,
            pe = quote.pe_ratio,
            rsi = technical.rsi,
            rsi_label = technical.rsi_label(),
            macd = technical.macd,
            signal = technical.signal,
            sma50 = technical.sma_50,
            sma200 = technical.sma_200,
            signal_upper = technical.signal.to_uppercase(),
        );

        let mut combined = Map::new();
        for part in [serde_json::to_value(&quote), serde_json::to_value(&technical)] {
            if let Value::Object(fields) = part
                .map_err(|e| WorkerFailure::new(format!("unserializable market data: {}", e)))?
            {
                combined.extend(fields);
            }
        }

        Ok(WorkerResult::new(summary).with_field("market_data", Value::Object(combined)))
    }
}

pub struct SentimentWorker {
    sentiment: Arc<dyn SentimentSource>,
}

#[async_trait]
impl Worker for SentimentWorker {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn reads(&self) -> &[&'static str] {
        &["ticker"]
    }

    fn writes(&self) -> &[&'static str] {
        &["sentiment_score"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let ticker = state.require_str("ticker")?;
        let sentiment = self.sentiment.news_sentiment(ticker).await?;

        let topics: Vec<String> = sentiment
            .key_topics
            .iter()
            .map(|t| format!("- {}", t))
            .collect();
        let summary = format!(
            "Sentiment Analysis for {}:\n\
             Overall Sentiment: {} ({:+.2})\n\
             News Articles Analyzed: {}\n\
             Key Topics:\n{}\n\
             Interpretation: {}",
            ticker,
            sentiment.sentiment_label.to_uppercase(),
            sentiment.sentiment_score,
            sentiment.news_count,
            topics.join("\n"),
            sentiment.interpretation()
        );

        Ok(WorkerResult::new(summary)
            .with_field("sentiment_score", json!(sentiment.sentiment_score)))
    }
}

pub struct WriterWorker {
    model: Arc<dyn Model>,
}

impl WriterWorker {
    /// Evidence for a section: the producing worker's transcript summary, or
    /// the raw field when the caller supplied it up front
    fn evidence(state: &StateView<'_>, worker: Step, field: &str) -> String {
        state
            .transcript()
            .iter()
            .rev()
            .find(|record| record.worker == worker.as_str())
            .map(|record| record.summary.clone())
            .or_else(|| state.get(field).map(|v| format!("{}: {}", field, v)))
            .unwrap_or_else(|| "Not available".to_string())
    }
}

#[async_trait]
impl Worker for WriterWorker {
    fn name(&self) -> &str {
        "writer"
    }

    fn reads(&self) -> &[&'static str] {
        &["ticker", "market_data", "sentiment_score"]
    }

    fn writes(&self) -> &[&'static str] {
        &["final_report"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let ticker = state.require_str("ticker")?;
        let prompt = format!(
            "Based on the following analysis for {}, write a comprehensive investment recommendation:\n\n\
             Market Data:\n{}\n\n\
             Sentiment Analysis:\n{}\n\n\
             Provide a clear recommendation (BUY/HOLD/SELL) with supporting rationale.",
            ticker,
            Self::evidence(&state, Step::MarketData, "market_data"),
            Self::evidence(&state, Step::Sentiment, "sentiment_score"),
        );

        let narrative = generate_text(self.model.as_ref(), ANALYST_CONTEXT, &prompt).await?;
        let report = format!(
            "# Financial Analysis Report: {}\n\n{}\n\n---\n{}\n",
            ticker,
            narrative.trim(),
            DISCLAIMER
        );

        Ok(WorkerResult::new(format!(
            "Investment report for {} drafted by {}",
            ticker,
            self.model.name()
        ))
        .with_field("final_report", json!(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::offline::OfflineModel;

    #[test]
    fn test_builder_validates() {
        let model: Arc<dyn Model> = Arc::new(OfflineModel::new());
        assert!(builder(&Sources::mock(), model).build().is_ok());
    }

    #[test]
    fn test_step_order() {
        assert_eq!(Step::all(), &[Step::MarketData, Step::Sentiment, Step::Writer]);
    }
}
