//! HTTP interface over [`SortService`].
//!
//! | Method | Path                 | Operation                         |
//! |--------|----------------------|-----------------------------------|
//! | POST   | `/api/sort`          | submit a job (202 new, 200 known) |
//! | GET    | `/api/sort`          | list all jobs                     |
//! | GET    | `/api/sort/:id`      | get one job                       |
//! | POST   | `/api/sort/process`  | sort synchronously                |
//! | GET    | `/api/sort/events`   | server-sent job events            |
//! | GET    | `/api/worker`        | worker state                      |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::SortError;
use crate::scheduler::{Enqueued, SortJob};
use crate::service::SortService;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<SortService>,
}

/// Transport representation of a [`SortJob`].
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub status: String,
    pub input: Vec<i64>,
    pub output: Option<Vec<i64>>,
    pub duration_ms: Option<f64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SortJob> for JobResponse {
    fn from(job: SortJob) -> Self {
        Self {
            id: job.id,
            status: job.status.to_string(),
            input: job.input,
            output: job.output,
            duration_ms: job.duration.map(|d| d.as_secs_f64() * 1000.0),
            error: job.error,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Deserialize)]
struct SubmitSortRequest {
    values: Vec<i64>,
    /// Caller-chosen id; one is generated when absent.
    #[serde(default)]
    id: Option<Uuid>,
}

#[derive(Deserialize)]
struct ProcessSortRequest {
    values: Vec<i64>,
}

#[derive(Serialize)]
struct WorkerResponse {
    state: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error type for handlers; renders as `{"error": ...}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<SortError> for ApiError {
    fn from(err: SortError) -> Self {
        let status = match err {
            SortError::JobNotFound(_) => StatusCode::NOT_FOUND,
            SortError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SortError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            SortError::ExecutionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sort", get(list_jobs_handler).post(submit_job_handler))
        .route("/api/sort/process", post(process_handler))
        .route("/api/sort/events", get(events_handler))
        .route("/api/sort/:id", get(get_job_handler))
        .route("/api/worker", get(worker_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled.
pub async fn run_api(
    addr: SocketAddr,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Starting HTTP API");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn submit_job_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SubmitSortRequest>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let job = match payload.id {
        Some(id) => SortJob::with_id(id, payload.values),
        None => SortJob::new(payload.values),
    };

    let (status, job) = match state.service.submit(job).await? {
        Enqueued::Added(job) => (StatusCode::ACCEPTED, job),
        Enqueued::Existing(job) => (StatusCode::OK, job),
    };

    Ok((status, Json(job.into())))
}

async fn list_jobs_handler(State(state): State<ApiState>) -> Json<Vec<JobResponse>> {
    let jobs = state
        .service
        .list_jobs()
        .await
        .into_iter()
        .map(JobResponse::from)
        .collect();

    Json(jobs)
}

async fn get_job_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|e| ApiError::bad_request(format!("Invalid job ID: {}", e)))?;

    let job = state.service.get_job(&id).await?;
    Ok(Json(job.into()))
}

async fn process_handler(
    State(state): State<ApiState>,
    Json(payload): Json<ProcessSortRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.service.run_once(SortJob::new(payload.values)).await?;
    Ok(Json(job.into()))
}

async fn events_handler(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(state.service.subscribe())
        // A lagging subscriber just misses events; the job list stays authoritative.
        .filter_map(|event| event.ok())
        .map(|event| Event::default().event("job").json_data(event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn worker_handler(State(state): State<ApiState>) -> Json<WorkerResponse> {
    Json(WorkerResponse {
        state: state.service.worker_state().to_string(),
    })
}
