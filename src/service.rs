use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::pool::{PoolError, WorkerPool};

pub const STATUS_MESSAGE: &str = "Gesture recognition server is running";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageRequest {
    pub base64_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GestureResponse {
    pub gesture: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shared state of the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pool: Arc<WorkerPool<Pipeline>>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(pool: WorkerPool<Pipeline>, request_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            request_timeout,
        }
    }
}

/// Everything that can go wrong while answering a request.
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(JsonRejection),
    Pipeline(PipelineError),
    Pool(PoolError),
    Timeout(Duration),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(PipelineError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Pool(PoolError::JobPanicked(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Pool(PoolError::Exhausted) | ApiError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest(e) => e.body_text(),
            ApiError::Pipeline(e) => e.to_string(),
            ApiError::Pool(e) => e.to_string(),
            ApiError::Timeout(limit) => format!("request did not finish within {:?}", limit),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<PoolError> for ApiError {
    fn from(e: PoolError) -> Self {
        ApiError::Pool(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.message();
        if status.is_server_error() {
            log::error!("request failed: {}", error);
        } else {
            log::debug!("rejected request: {}", error);
        }
        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/process-image", post(process_image))
        .with_state(state)
}

async fn read_root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_MESSAGE.to_string(),
    })
}

async fn process_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<GestureResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::InvalidRequest)?;

    let job = state
        .pool
        .run(move |pipeline| pipeline.process_base64(&request.base64_image));
    let outcome = tokio::time::timeout(state.request_timeout, job)
        .await
        .map_err(|_| ApiError::Timeout(state.request_timeout))?;
    let gesture = outcome??;

    log::debug!("recognized gesture {:?}", gesture);
    Ok(Json(GestureResponse { gesture }))
}
