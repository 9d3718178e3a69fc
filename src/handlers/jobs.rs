use axum::extract::State;
use serde_json::{json, Value};

use crate::database::models::{Job, JobDetail, JobListing, JobPatch, JobRepository, JobSearch, NewJob};
use crate::database::Repository;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::state::AppState;

fn repository(state: &AppState) -> JobRepository {
    JobRepository::new(state.pool.clone())
}

/// POST /jobs - create a job for an existing company (admin)
pub async fn create(State(state): State<AppState>, ValidatedJson(data): ValidatedJson<NewJob>) -> ApiResult<Job> {
    let job = repository(&state).create(data).await?;
    Ok(ApiResponse::created(job))
}

/// GET /jobs - list jobs, optionally filtered by `title`, `minSalary` and `hasEquity`
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(search): ValidatedQuery<JobSearch>,
) -> ApiResult<Vec<JobListing>> {
    let jobs = repository(&state).find_all(search).await?;
    Ok(ApiResponse::success(jobs))
}

/// GET /jobs/:id - a job with its company
pub async fn show(State(state): State<AppState>, ValidatedPath(id): ValidatedPath<i32>) -> ApiResult<JobDetail> {
    let job = repository(&state).get(&id).await?;
    Ok(ApiResponse::success(job))
}

/// PATCH /jobs/:id - partial update of title, salary, equity (admin)
pub async fn update(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
    ValidatedJson(patch): ValidatedJson<JobPatch>,
) -> ApiResult<Job> {
    let job = repository(&state).update(&id, patch).await?;
    Ok(ApiResponse::success(job))
}

/// DELETE /jobs/:id (admin)
pub async fn delete(State(state): State<AppState>, ValidatedPath(id): ValidatedPath<i32>) -> ApiResult<Value> {
    repository(&state).remove(&id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}
