use axum::extract::{Extension, State};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::database::models::{NewUser, UserLogin, UserRegistration, UserRepository};
use crate::database::Repository;
use crate::middleware::{ApiResponse, ApiResult, Identity, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /auth/token - exchange username/password for a token
pub async fn token(
    State(state): State<AppState>,
    ValidatedJson(login): ValidatedJson<UserLogin>,
) -> ApiResult<TokenResponse> {
    let user = UserRepository::new(state.pool.clone())
        .authenticate(&login.username, &login.password)
        .await?;

    let token = state.tokens.create_token(&AuthUser::from(&user))?;
    tracing::info!("Issued token for {}", user.username);
    Ok(ApiResponse::success(TokenResponse { token }))
}

/// POST /auth/register - create a regular user and log them in
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(registration): ValidatedJson<UserRegistration>,
) -> ApiResult<TokenResponse> {
    let user = UserRepository::new(state.pool.clone())
        .create(NewUser::from(registration))
        .await?;

    let token = state.tokens.create_token(&AuthUser::from(&user))?;
    tracing::info!("Registered user {}", user.username);
    Ok(ApiResponse::created(TokenResponse { token }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub username: String,
    pub is_admin: bool,
}

/// GET /auth/whoami - the identity behind the bearer token (logged in)
pub async fn whoami(Extension(identity): Extension<Identity>) -> ApiResult<WhoAmI> {
    let user = identity.require_logged_in()?;
    Ok(ApiResponse::success(WhoAmI {
        username: user.username.clone(),
        is_admin: user.is_admin,
    }))
}
