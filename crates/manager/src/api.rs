//! HTTP control surface
//!
//! CRUD over streams plus bulk replace, mounted at `/streams`. Bodies are
//! YAML or JSON (JSON parses as YAML). Status mapping: 400 for malformed
//! input and registry precondition failures on mutation, 404 for reads of
//! missing streams, 502 for wiring and shutdown failures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, warn};

use weir_stream::StreamConfig;

use crate::{ManagerError, StreamManager};

/// Build the control-plane router over `manager`.
pub fn router(manager: Arc<StreamManager>) -> Router {
    Router::new()
        .route("/streams", get(list_streams).post(replace_streams))
        .route(
            "/streams/{id}",
            get(read_stream)
                .post(create_stream)
                .put(update_stream)
                .delete(delete_stream),
        )
        .with_state(manager)
}

/// Control-plane failures mapped onto status codes.
#[derive(Debug)]
enum ApiError {
    /// Malformed input or a registry precondition failure.
    BadRequest(String),
    /// Read of an unknown stream.
    NotFound(String),
    /// Wiring or shutdown failure inside the service.
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Internal(msg) => msg,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Internal(msg) => warn!(status = %status, error = msg, "streams api error"),
            _ => debug!(status = %status, error = self.message(), "streams api request error"),
        }
        let body = ErrorBody {
            error: self.message().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

fn parse_config(body: &[u8]) -> Result<StreamConfig, ApiError> {
    serde_yaml::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("parsing stream config: {err}")))
}

#[derive(Serialize)]
struct StreamSummaryBody {
    active: bool,
    uptime: f64,
    uptime_str: String,
}

impl StreamSummaryBody {
    fn new(active: bool, uptime: Duration) -> Self {
        Self {
            active,
            uptime: uptime.as_secs_f64(),
            uptime_str: humantime::format_duration(uptime).to_string(),
        }
    }
}

async fn list_streams(
    State(manager): State<Arc<StreamManager>>,
) -> Json<BTreeMap<String, StreamSummaryBody>> {
    let list = manager
        .list()
        .into_iter()
        .map(|(id, (active, uptime))| (id, StreamSummaryBody::new(active, uptime)))
        .collect();
    Json(list)
}

async fn create_stream(
    State(manager): State<Arc<StreamManager>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(), ApiError> {
    let config = parse_config(&body)?;
    manager.create(&id, config).map_err(|err| match err {
        ManagerError::StreamExists => ApiError::BadRequest(err.to_string()),
        other => ApiError::Internal(other.to_string()),
    })
}

#[derive(Serialize)]
struct StreamReadBody {
    active: bool,
    uptime: f64,
    uptime_str: String,
    config: serde_yaml::Value,
}

async fn read_stream(
    State(manager): State<Arc<StreamManager>>,
    Path(id): Path<String>,
) -> Result<Json<StreamReadBody>, ApiError> {
    let status = manager.read(&id).map_err(|err| match err {
        ManagerError::StreamDoesNotExist => ApiError::NotFound(err.to_string()),
        other => ApiError::Internal(other.to_string()),
    })?;
    let config = status
        .config
        .sanitised()
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(StreamReadBody {
        active: status.active,
        uptime: status.uptime.as_secs_f64(),
        uptime_str: humantime::format_duration(status.uptime).to_string(),
        config,
    }))
}

async fn update_stream(
    State(manager): State<Arc<StreamManager>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(), ApiError> {
    let config = parse_config(&body)?;
    manager
        .update(&id, config, manager.api_timeout())
        .await
        .map_err(|err| match err {
            ManagerError::StreamDoesNotExist => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        })
}

async fn delete_stream(
    State(manager): State<Arc<StreamManager>>,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    manager
        .delete(&id, manager.api_timeout())
        .await
        .map_err(|err| match err {
            ManagerError::StreamDoesNotExist => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        })
}

/// Replace the full stream set: delete ids missing from the body, update
/// ids present in both, create new ids. The three sets run in parallel
/// under one shared deadline; failures are concatenated into one report.
async fn replace_streams(
    State(manager): State<Arc<StreamManager>>,
    body: Bytes,
) -> Result<(), ApiError> {
    let desired: HashMap<String, StreamConfig> = serde_yaml::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("parsing stream set: {err}")))?;
    let existing: HashSet<String> = manager.list().into_keys().collect();
    let deadline = Instant::now() + manager.api_timeout();

    let mut tasks = Vec::new();
    for id in existing.iter().filter(|id| !desired.contains_key(*id)) {
        let manager = Arc::clone(&manager);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            let remaining = deadline.saturating_duration_since(Instant::now());
            manager
                .delete(&id, remaining)
                .await
                .map_err(|err| format!("failed to delete stream '{id}': {err}"))
        }));
    }
    for (id, config) in desired {
        let manager = Arc::clone(&manager);
        if existing.contains(&id) {
            tasks.push(tokio::spawn(async move {
                let remaining = deadline.saturating_duration_since(Instant::now());
                manager
                    .update(&id, config, remaining)
                    .await
                    .map_err(|err| format!("failed to update stream '{id}': {err}"))
            }));
        } else {
            tasks.push(tokio::spawn(async move {
                manager
                    .create(&id, config)
                    .map_err(|err| format!("failed to create stream '{id}': {err}"))
            }));
        }
    }

    let mut failures = Vec::new();
    for result in futures::future::join_all(tasks).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(report)) => failures.push(report),
            Err(join_err) => failures.push(format!("stream task failed: {join_err}")),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(failures.join("\n")))
    }
}
