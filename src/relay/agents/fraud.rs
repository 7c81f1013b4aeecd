// SPDX-License-Identifier: MIT

//! Fraud detection: three independent signals, then a weighted risk score

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::round4;
use crate::adk::error::WorkerFailure;
use crate::adk::worker::{StateView, Worker, WorkerResult};
use crate::relay::sources::{FraudSignalSource, Sources, TransactionContext};
use crate::relay::workflow::builder::GraphBuilder;
use crate::relay::workflow::state::{FieldType, StateSchema};
use crate::relay::workflow::supervisor::RouteTable;

pub const NAME: &str = "fraud_detection";

/// Combined risk above this flags the transaction
pub const FRAUD_THRESHOLD: f64 = 0.7;

const VELOCITY_WEIGHT: f64 = 0.4;
const GEO_WEIGHT: f64 = 0.3;
const DEVICE_WEIGHT: f64 = 0.3;

worker_ids! {
    /// Workers of the fraud detection workflow
    pub enum Step {
        VelocityCheck => "velocity_check",
        Geolocation => "geolocation",
        DeviceFingerprint => "device_fingerprint",
        RiskScoring => "risk_scoring",
    }
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .optional_input("transaction_id", FieldType::String)
        .input("amount", FieldType::Number)
        .optional_input("location", FieldType::String)
        .optional_input("device_id", FieldType::String)
        .output("velocity_score", FieldType::Number)
        .output("geo_score", FieldType::Number)
        .output("device_score", FieldType::Number)
        .output("risk_score", FieldType::Number)
        .output("fraud_detected", FieldType::Boolean)
}

pub fn route_table() -> RouteTable<Step> {
    RouteTable::new(NAME)
        .when_unset("velocity_score", Step::VelocityCheck)
        .when_unset("geo_score", Step::Geolocation)
        .when_unset("device_score", Step::DeviceFingerprint)
        .when_unset("risk_score", Step::RiskScoring)
}

pub fn builder(sources: &Sources) -> GraphBuilder<Step> {
    let signals = &sources.fraud;
    GraphBuilder::new(NAME, schema())
        .routes(route_table())
        .worker(
            Step::VelocityCheck,
            Arc::new(SignalWorker::new(Signal::Velocity, signals.clone())),
        )
        .worker(
            Step::Geolocation,
            Arc::new(SignalWorker::new(Signal::Geolocation, signals.clone())),
        )
        .worker(
            Step::DeviceFingerprint,
            Arc::new(SignalWorker::new(Signal::Device, signals.clone())),
        )
        .worker(Step::RiskScoring, Arc::new(RiskScoringWorker))
}

/// 0.4·velocity + 0.3·geo + 0.3·device
pub fn combined_risk(velocity: f64, geo: f64, device: f64) -> f64 {
    round4(VELOCITY_WEIGHT * velocity + GEO_WEIGHT * geo + DEVICE_WEIGHT * device)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Velocity,
    Geolocation,
    Device,
}

impl Signal {
    fn worker_name(self) -> &'static str {
        match self {
            Signal::Velocity => "velocity_check",
            Signal::Geolocation => "geolocation",
            Signal::Device => "device_fingerprint",
        }
    }

    fn reads(self) -> &'static [&'static str] {
        match self {
            Signal::Velocity => &["transaction_id", "amount"],
            Signal::Geolocation => &["transaction_id", "location"],
            Signal::Device => &["transaction_id", "device_id"],
        }
    }

    fn output(self) -> &'static [&'static str] {
        match self {
            Signal::Velocity => &["velocity_score"],
            Signal::Geolocation => &["geo_score"],
            Signal::Device => &["device_score"],
        }
    }

    fn describe(self, score: f64) -> String {
        let (label, normal, unusual) = match self {
            Signal::Velocity => ("Velocity Check", "normal pattern", "unusual pattern"),
            Signal::Geolocation => ("Geolocation", "expected location", "unexpected location"),
            Signal::Device => ("Device Fingerprint", "recognized device", "unrecognized device"),
        };
        let note = if score < 0.5 { normal } else { unusual };
        format!("{}: Score {:.2} ({})", label, score, note)
    }
}

/// Queries one fraud signal and records its score
struct SignalWorker {
    signal: Signal,
    source: Arc<dyn FraudSignalSource>,
}

impl SignalWorker {
    fn new(signal: Signal, source: Arc<dyn FraudSignalSource>) -> Self {
        Self { signal, source }
    }
}

#[async_trait]
impl Worker for SignalWorker {
    fn name(&self) -> &str {
        self.signal.worker_name()
    }

    fn reads(&self) -> &[&'static str] {
        self.signal.reads()
    }

    fn writes(&self) -> &[&'static str] {
        self.signal.output()
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let txn = TransactionContext {
            transaction_id: state.get_str("transaction_id").map(str::to_string),
            amount: state.get("amount").and_then(|v| v.as_f64()),
            location: state.get_str("location").map(str::to_string),
            device_id: state.get_str("device_id").map(str::to_string),
        };

        let score = match self.signal {
            Signal::Velocity => self.source.velocity(&txn).await?,
            Signal::Geolocation => self.source.geolocation(&txn).await?,
            Signal::Device => self.source.device(&txn).await?,
        };
        if !(0.0..=1.0).contains(&score) {
            return Err(WorkerFailure::new(format!(
                "{} score {} is outside 0..=1",
                self.signal.worker_name(),
                score
            )));
        }

        Ok(WorkerResult::new(self.signal.describe(score))
            .with_field(self.signal.output()[0], json!(score)))
    }
}

pub struct RiskScoringWorker;

#[async_trait]
impl Worker for RiskScoringWorker {
    fn name(&self) -> &str {
        "risk_scoring"
    }

    fn reads(&self) -> &[&'static str] {
        &["velocity_score", "geo_score", "device_score"]
    }

    fn writes(&self) -> &[&'static str] {
        &["risk_score", "fraud_detected"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let risk = combined_risk(
            state.require_f64("velocity_score")?,
            state.require_f64("geo_score")?,
            state.require_f64("device_score")?,
        );
        let fraud_detected = risk > FRAUD_THRESHOLD;
        let verdict = if fraud_detected {
            "FRAUD DETECTED"
        } else {
            "APPROVED"
        };

        Ok(
            WorkerResult::new(format!("Risk Score: {:.2} - {}", risk, verdict))
                .with_field("risk_score", json!(risk))
                .with_field("fraud_detected", json!(fraud_detected)),
        )
    }
}
