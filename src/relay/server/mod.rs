// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::adk::error::{RelayError, WorkflowError};
use crate::relay::catalog::{RunRequest, Runtime, WorkflowKind};
use crate::relay::workflow::graph::RunEvent;

type ApiResponse = (StatusCode, Json<Value>);

pub fn router(runtime: Arc<Runtime>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/workflows", get(list_workflows))
        .route("/api/runs", post(create_run))
        .route("/api/runs/stream", post(stream_run))
        .route("/api/runs/{id}", get(get_run))
        .route("/api/runs/{id}/resume", post(resume_run))
        .layer(CorsLayer::permissive())
        .with_state(runtime)
}

pub async fn serve(
    runtime: Arc<Runtime>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(runtime);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(runtime): State<Arc<Runtime>>) -> Json<Value> {
    Json(json!({ "status": "ok", "model": runtime.model_name() }))
}

async fn list_workflows() -> Json<Value> {
    let workflows: Vec<_> = WorkflowKind::all().iter().map(|kind| kind.info()).collect();
    Json(json!(workflows))
}

async fn create_run(
    State(runtime): State<Arc<Runtime>>,
    Json(request): Json<RunRequest>,
) -> ApiResponse {
    match runtime.invoke(request, &CancellationToken::new()).await {
        Ok(report) => (StatusCode::OK, Json(json!(report))),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct ResumeRequest {
    workflow: WorkflowKind,
    #[serde(default)]
    max_steps: Option<usize>,
}

async fn resume_run(
    State(runtime): State<Arc<Runtime>>,
    Path(id): Path<String>,
    Json(request): Json<ResumeRequest>,
) -> ApiResponse {
    match runtime
        .resume(
            request.workflow,
            &id,
            request.max_steps,
            &CancellationToken::new(),
            None,
        )
        .await
    {
        Ok(report) => (StatusCode::OK, Json(json!(report))),
        Err(err) => error_response(err),
    }
}

async fn get_run(State(runtime): State<Arc<Runtime>>, Path(id): Path<String>) -> ApiResponse {
    match runtime.checkpoint(&id).await {
        Ok(Some(state)) => (StatusCode::OK, Json(json!(state))),
        Ok(None) => error_response(WorkflowError::CheckpointNotFound(id).into()),
        Err(err) => error_response(err),
    }
}

/// Stream run events as they happen
///
/// Errors raised before the first step produce no run events, so they are
/// sent as a trailing `error` event.
async fn stream_run(
    State(runtime): State<Arc<Runtime>>,
    Json(request): Json<RunRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<RunEvent>(100);
    let (done_tx, done_rx) = oneshot::channel::<Option<String>>();
    let cancel = CancellationToken::new();
    // Dropping the stream (client went away) cancels the run.
    let guard = cancel.clone().drop_guard();

    tokio::spawn(async move {
        let result = runtime
            .invoke_with_events(request, &cancel, Some(&tx))
            .await;
        let error = match result {
            Err(err) if err.fault().is_none() => Some(err.to_string()),
            _ => None,
        };
        let _ = done_tx.send(error);
    });

    let events = ReceiverStream::new(rx).map(move |event| {
        let _keep = &guard;
        Ok::<_, Infallible>(to_sse(&event))
    });
    let trailer = stream::once(done_rx).filter_map(|done| match done {
        Ok(Some(error)) => Some(Ok::<_, Infallible>(
            Event::default()
                .event("error")
                .data(json!({ "error": error }).to_string()),
        )),
        _ => None,
    });

    Sse::new(events.chain(trailer)).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}

fn to_sse(event: &RunEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

fn error_response(err: RelayError) -> ApiResponse {
    let status = match &err {
        RelayError::Workflow(WorkflowError::UnknownWorkflow(_))
        | RelayError::Workflow(WorkflowError::CheckpointNotFound(_)) => StatusCode::NOT_FOUND,
        RelayError::Workflow(_) | RelayError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = match err.fault() {
        Some(fault) => json!({ "error": err.to_string(), "state": fault.state }),
        None => json!({ "error": err.to_string() }),
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::offline::OfflineModel;
    use crate::relay::config::RuntimeConfig;
    use crate::relay::sources::Sources;
    use crate::relay::workflow::checkpoint::InMemoryCheckpointStore;

    fn runtime() -> Arc<Runtime> {
        Arc::new(
            Runtime::new(
                RuntimeConfig::default(),
                Sources::mock(),
                Arc::new(OfflineModel::new()),
            )
            .with_checkpoint(Arc::new(InMemoryCheckpointStore::new())),
        )
    }

    fn request(body: Value) -> RunRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_list_workflows() {
        let Json(body) = list_workflows().await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"credit_underwriting"));
    }

    #[tokio::test]
    async fn test_create_and_fetch_run() {
        let runtime = runtime();
        let (status, Json(body)) = create_run(
            State(runtime.clone()),
            Json(request(json!({
                "workflow": "fraud_detection",
                "run_id": "txn-42",
                "inputs": {"amount": 250.0}
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], json!(false));
        assert_eq!(body["status"], json!("completed"));

        let (status, _) = get_run(State(runtime.clone()), Path("txn-42".to_string())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get_run(State(runtime), Path("missing".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_bad_requests() {
        let (status, Json(body)) = create_run(
            State(runtime()),
            Json(request(json!({
                "workflow": "credit_underwriting",
                "inputs": {"credit_score": 720}
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Missing required input"));
    }

    #[tokio::test]
    async fn test_resume_with_new_budget() {
        let runtime = runtime();
        let (status, Json(body)) = create_run(
            State(runtime.clone()),
            Json(request(json!({
                "workflow": "credit_underwriting",
                "run_id": "loan-3",
                "max_steps": 2,
                "inputs": {"credit_score": 720, "income": 5000.0, "debt": 1500.0}
            }))),
        )
        .await;
        assert_ne!(status, StatusCode::OK);
        assert_eq!(body["state"]["step_count"], json!(2));

        let resume: ResumeRequest =
            serde_json::from_value(json!({"workflow": "credit-underwriting", "max_steps": 3}))
                .unwrap();
        let (status, Json(body)) =
            resume_run(State(runtime), Path("loan-3".to_string()), Json(resume)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], json!("APPROVED"));
    }
}
