use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::models::{NewUser, User, UserDetail, UserPatch, UserRepository};
use crate::database::Repository;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson, ValidatedPath};
use crate::state::AppState;

fn repository(state: &AppState) -> UserRepository {
    UserRepository::new(state.pool.clone())
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: User,
    pub token: String,
}

/// POST /users - create a user, possibly an admin (admin)
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<NewUser>,
) -> ApiResult<CreatedUser> {
    let user = repository(&state).create(data).await?;
    let token = state.tokens.create_token(&AuthUser::from(&user))?;
    Ok(ApiResponse::created(CreatedUser { user, token }))
}

/// GET /users - every user, ordered by username (admin)
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = repository(&state).find_all(()).await?;
    Ok(ApiResponse::success(users))
}

/// GET /users/:username - a user with the ids of jobs applied to
pub async fn show(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<UserDetail> {
    let user = repository(&state).get(&username).await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /users/:username - partial update of password, names, email
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ValidatedJson(patch): ValidatedJson<UserPatch>,
) -> ApiResult<User> {
    let user = repository(&state).update(&username, patch).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /users/:username
pub async fn delete(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Value> {
    repository(&state).remove(&username).await?;
    Ok(ApiResponse::success(json!({ "deleted": username })))
}

/// POST /users/:username/jobs/:id - apply to a job
pub async fn apply(
    State(state): State<AppState>,
    ValidatedPath((username, job_id)): ValidatedPath<(String, i32)>,
) -> ApiResult<Value> {
    repository(&state).apply_to_job(&username, job_id).await?;
    Ok(ApiResponse::success(json!({ "applied": job_id })))
}
