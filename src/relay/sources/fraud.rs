// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::adk::error::SourceError;

/// Transaction attributes a fraud signal may inspect
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionContext {
    pub transaction_id: Option<String>,
    pub amount: Option<f64>,
    pub location: Option<String>,
    pub device_id: Option<String>,
}

/// Individual fraud risk signals, each in 0..=1
#[async_trait]
pub trait FraudSignalSource: Send + Sync {
    async fn velocity(&self, txn: &TransactionContext) -> Result<f64, SourceError>;

    async fn geolocation(&self, txn: &TransactionContext) -> Result<f64, SourceError>;

    async fn device(&self, txn: &TransactionContext) -> Result<f64, SourceError>;
}

/// Returns the same scores for every transaction
#[derive(Debug, Clone, PartialEq)]
pub struct MockFraudSignals {
    pub velocity: f64,
    pub geolocation: f64,
    pub device: f64,
}

impl MockFraudSignals {
    pub fn with_scores(velocity: f64, geolocation: f64, device: f64) -> Self {
        Self {
            velocity,
            geolocation,
            device,
        }
    }
}

impl Default for MockFraudSignals {
    fn default() -> Self {
        Self::with_scores(0.30, 0.10, 0.20)
    }
}

#[async_trait]
impl FraudSignalSource for MockFraudSignals {
    async fn velocity(&self, _txn: &TransactionContext) -> Result<f64, SourceError> {
        Ok(self.velocity)
    }

    async fn geolocation(&self, _txn: &TransactionContext) -> Result<f64, SourceError> {
        Ok(self.geolocation)
    }

    async fn device(&self, _txn: &TransactionContext) -> Result<f64, SourceError> {
        Ok(self.device)
    }
}
