//! Read-only status HTTP surface.
//!
//! Purely an operability addition, off by default, for inspecting a
//! running Controller's last-persisted state and live monitor snapshot.
//! Every handler returns the same `{success, data, error}` envelope so
//! callers never have to branch on response shape.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use edgemesh_monitor::FailureMonitor;
use edgemesh_state::StateStore;

#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub monitor: Arc<FailureMonitor>,
}

#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data: Some(data), error: None })
    }
}

fn error_response(msg: String) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()> { success: false, data: None, error: Some(msg) }),
    )
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/placement", get(placement))
        .route("/invocation-path", get(invocation_path))
        .route("/monitor", get(monitor))
        .with_state(state)
}

async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.get_topology() {
        Ok(topology) => ApiResponse::ok(topology).into_response(),
        Err(e) => error_response(e.to_string()).into_response(),
    }
}

async fn placement(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.get_placement() {
        Ok(placement) => ApiResponse::ok(placement).into_response(),
        Err(e) => error_response(e.to_string()).into_response(),
    }
}

async fn invocation_path(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.get_invocation_path() {
        Ok(path) => ApiResponse::ok(path).into_response(),
        Err(e) => error_response(e.to_string()).into_response(),
    }
}

async fn monitor(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.monitor.snapshot().await).into_response()
}
