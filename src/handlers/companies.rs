use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::database::models::{
    Company, CompanyDetail, CompanyPatch, CompanyRepository, CompanySearch, NewCompany,
};
use crate::database::Repository;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson, ValidatedQuery};
use crate::state::AppState;

fn repository(state: &AppState) -> CompanyRepository {
    CompanyRepository::new(state.pool.clone())
}

/// POST /companies - create a company (admin)
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<NewCompany>,
) -> ApiResult<Company> {
    let company = repository(&state).create(data).await?;
    Ok(ApiResponse::created(company))
}

/// GET /companies - list companies, optionally filtered by
/// `nameLike`, `minEmployees` and `maxEmployees`
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(search): ValidatedQuery<CompanySearch>,
) -> ApiResult<Vec<Company>> {
    let companies = repository(&state).find_all(search).await?;
    Ok(ApiResponse::success(companies))
}

/// GET /companies/:handle - a company with its jobs
pub async fn show(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<CompanyDetail> {
    let company = repository(&state).get(&handle).await?;
    Ok(ApiResponse::success(company))
}

/// PATCH /companies/:handle - partial update (admin)
pub async fn update(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    ValidatedJson(patch): ValidatedJson<CompanyPatch>,
) -> ApiResult<Company> {
    let company = repository(&state).update(&handle, patch).await?;
    Ok(ApiResponse::success(company))
}

/// DELETE /companies/:handle (admin)
pub async fn delete(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<Value> {
    repository(&state).remove(&handle).await?;
    Ok(ApiResponse::success(json!({ "deleted": handle })))
}
