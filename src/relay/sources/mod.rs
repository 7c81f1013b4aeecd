// SPDX-License-Identifier: MIT

//! Data-fetch collaborators used by workers
//!
//! Each source is a narrow async contract with a deterministic mock. Workers
//! treat a call as a side-effect-free query; any failure surfaces as a
//! `SourceError` and becomes a `WorkerFailure`.

pub mod fraud;
pub mod market;
pub mod sentiment;
pub mod watchlist;

use std::sync::Arc;

pub use fraud::{FraudSignalSource, MockFraudSignals, TransactionContext};
pub use market::{MarketDataSource, MockMarketData, Quote, TechnicalIndicators};
pub use sentiment::{MockSentiment, NewsSentiment, SentimentSource};
pub use watchlist::{MockWatchlist, ScreeningResult, WatchlistSource};

/// The collaborators shared by all workflows of a runtime
#[derive(Clone)]
pub struct Sources {
    pub market: Arc<dyn MarketDataSource>,
    pub sentiment: Arc<dyn SentimentSource>,
    pub watchlist: Arc<dyn WatchlistSource>,
    pub fraud: Arc<dyn FraudSignalSource>,
}

impl Sources {
    /// Deterministic mocks for every source
    pub fn mock() -> Self {
        Self {
            market: Arc::new(MockMarketData),
            sentiment: Arc::new(MockSentiment),
            watchlist: Arc::new(MockWatchlist::new()),
            fraud: Arc::new(MockFraudSignals::default()),
        }
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::mock()
    }
}
