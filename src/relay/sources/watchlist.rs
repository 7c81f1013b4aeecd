// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::adk::error::SourceError;

/// Outcome of screening an entity against OFAC, sanctions and PEP lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub entity: String,
    pub ofac_match: bool,
    pub sanctions_match: bool,
    /// Politically exposed person
    pub pep_match: bool,
    /// 0 to 1
    pub risk_score: f64,
    pub status: String,
}

impl ScreeningResult {
    pub fn is_blocked(&self) -> bool {
        self.ofac_match || self.sanctions_match
    }
}

#[async_trait]
pub trait WatchlistSource: Send + Sync {
    async fn screen(&self, entity: &str) -> Result<ScreeningResult, SourceError>;
}

/// Clears every entity except those listed as sanctioned
#[derive(Debug, Clone, Default)]
pub struct MockWatchlist {
    sanctioned: HashSet<String>,
}

impl MockWatchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entity as an OFAC and sanctions match (case-insensitive)
    pub fn with_sanctioned(mut self, entity: &str) -> Self {
        self.sanctioned.insert(entity.trim().to_lowercase());
        self
    }
}

#[async_trait]
impl WatchlistSource for MockWatchlist {
    async fn screen(&self, entity: &str) -> Result<ScreeningResult, SourceError> {
        let entity = entity.trim();
        if entity.is_empty() {
            return Err(SourceError::not_found("watchlist", entity));
        }

        let hit = self.sanctioned.contains(&entity.to_lowercase());
        Ok(ScreeningResult {
            entity: entity.to_string(),
            ofac_match: hit,
            sanctions_match: hit,
            pep_match: false,
            risk_score: if hit { 0.95 } else { 0.15 },
            status: if hit { "blocked" } else { "clear" }.to_string(),
        })
    }
}
