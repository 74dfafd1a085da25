/// Task endpoints, scoped to the authenticated caller
use crate::{
    api::{
        extract::{parse_id, ValidatedJson, ValidatedQuery},
        response::ApiResponse,
        schemas::{TaskCreateRequest, TaskListQuery, TaskUpdateRequest},
    },
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    tasks::{Task, TaskPage},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:task_id",
            get(get_task).patch(update_task).delete(delete_task),
        )
}

async fn create_task(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<TaskCreateRequest>,
) -> AppResult<(StatusCode, ApiResponse<Task>)> {
    let task = ctx.tasks.create(&auth.id, req.into_new_task()?).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Task created successfully", task),
    ))
}

async fn list_tasks(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ValidatedQuery(query): ValidatedQuery<TaskListQuery>,
) -> AppResult<ApiResponse<TaskPage>> {
    let filter = query.into_filter(&auth.id)?;
    let page = ctx.tasks.list(&filter).await?;
    Ok(ApiResponse::ok("Tasks retrieved successfully", page))
}

async fn get_task(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(task_id): Path<String>,
) -> AppResult<ApiResponse<Task>> {
    let task_id = parse_id(&task_id, "Task")?;
    let task = ctx.tasks.get(&task_id, &auth.id).await?;
    Ok(ApiResponse::ok("Task retrieved successfully", task))
}

async fn update_task(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(task_id): Path<String>,
    ValidatedJson(req): ValidatedJson<TaskUpdateRequest>,
) -> AppResult<ApiResponse<Task>> {
    let task_id = parse_id(&task_id, "Task")?;
    let task = ctx
        .tasks
        .update(&task_id, &auth.id, &req.into_changes()?)
        .await?;
    Ok(ApiResponse::ok("Task updated successfully", task))
}

async fn delete_task(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(task_id): Path<String>,
) -> AppResult<ApiResponse<Task>> {
    let task_id = parse_id(&task_id, "Task")?;
    let task = ctx.tasks.delete(&task_id, &auth.id).await?;
    Ok(ApiResponse::ok("Task deleted successfully", task))
}
