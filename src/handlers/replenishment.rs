use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::replen_task::{ReplenTaskStatus, ReplenTrigger};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::replenishment::CreateRuleInput;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rules", get(list_rules).post(create_rule))
        .route("/rules/bulk", post(import_rules))
        .route("/generate", post(generate))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", patch(update_task))
}

async fn list_rules(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::REPLEN_VIEW)?;
    Ok(success_response(state.replenishment.list_rules().await?))
}

async fn create_rule(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRuleInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::REPLEN_EDIT)?;
    Ok(created_response(state.replenishment.create_rule(payload).await?))
}

#[derive(Debug, Deserialize)]
struct BulkRulesRequest {
    csv: String,
}

async fn import_rules(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<BulkRulesRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::REPLEN_EDIT)?;
    Ok(success_response(
        state.replenishment.import_rules_csv(&payload.csv).await?,
    ))
}

async fn generate(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::REPLEN_EDIT)?;
    Ok(success_response(
        state.replenishment.generate(ReplenTrigger::MinMax).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct TaskListQuery {
    status: Option<ReplenTaskStatus>,
}

async fn list_tasks(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::REPLEN_VIEW)?;
    Ok(success_response(state.replenishment.list_tasks(query.status).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaskAction {
    Assign,
    Start,
    Complete,
    Cancel,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskRequest {
    action: TaskAction,
    assignee: Option<Uuid>,
}

async fn update_task(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::REPLEN_EDIT)?;
    let task = match payload.action {
        TaskAction::Assign => {
            let assignee = payload.assignee.ok_or_else(|| {
                ServiceError::Validation("assign action needs an assignee".into())
            })?;
            state.replenishment.assign_task(id, assignee).await?
        }
        TaskAction::Start => state.replenishment.start_task(id).await?,
        TaskAction::Complete => {
            state
                .replenishment
                .complete_task(id, Some(user.user_id))
                .await?
        }
        TaskAction::Cancel => state.replenishment.cancel_task(id).await?,
    };
    Ok(success_response(task))
}
