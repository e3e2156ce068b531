use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use planner_shared::{
    AdminUserRow, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    SaveTasksRequest, StatusResponse, TaskRow,
};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/tasks/save", post(save_tasks))
        .route("/api/tasks/{email}/{planner_type}", get(list_tasks))
        .route("/api/admin/users", get(admin_users))
        .route("/api/admin/tasks/{email}", get(admin_user_tasks))
        .route("/api/admin/user/{email}", delete(admin_delete_user))
        .with_state(state)
}

/// Runs a blocking state call on the blocking pool and logs failures.
async fn blocking<T, F>(operation: &'static str, f: F) -> Result<Json<T>, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(ApiError::internal("Server error"))
        .and_then(|inner| inner);
    if let Err(err) = result.as_ref() {
        warn!(operation, status = %err.status, error = %err, "request failed");
    }
    result.map(Json)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(req) = body?;
    info!(email = %req.email, "register requested");
    blocking("register", move || state.register(&req)).await
}

#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body?;
    info!(email = %req.email, "login requested");
    blocking("login", move || state.login(&req)).await
}

#[instrument(skip(state))]
async fn list_tasks(
    State(state): State<AppState>,
    Path((email, planner_type)): Path<(String, String)>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    blocking("list_tasks", move || state.tasks(&email, &planner_type)).await
}

#[instrument(skip_all)]
async fn save_tasks(
    State(state): State<AppState>,
    body: Result<Json<SaveTasksRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = body?;
    info!(
        email = ?req.email,
        planner_type = ?req.planner_type,
        count = req.tasks.as_ref().map(Vec::len),
        "save requested"
    );
    blocking("save_tasks", move || state.save_tasks(req)).await
}

#[instrument(skip(state))]
async fn admin_users(State(state): State<AppState>) -> Result<Json<Vec<AdminUserRow>>, ApiError> {
    blocking("admin_users", move || state.users()).await
}

#[instrument(skip(state))]
async fn admin_user_tasks(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    blocking("admin_user_tasks", move || state.user_tasks(&email)).await
}

#[instrument(skip(state))]
async fn admin_delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    blocking("admin_delete_user", move || state.delete_user(&email)).await
}
