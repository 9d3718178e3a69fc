use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Who is making the request, as established by `authenticate_jwt`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    User(AuthUser),
}

impl Identity {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Identity::User(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn require_logged_in(&self) -> Result<&AuthUser, ApiError> {
        self.user().ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }

    pub fn require_admin(&self) -> Result<&AuthUser, ApiError> {
        match self.user() {
            Some(user) if user.is_admin => Ok(user),
            _ => Err(ApiError::unauthorized("Admin access required")),
        }
    }

    pub fn require_self_or_admin(&self, username: &str) -> Result<&AuthUser, ApiError> {
        match self.user() {
            Some(user) if user.is_admin || user.username == username => Ok(user),
            _ => Err(ApiError::unauthorized("Must be this user or an admin")),
        }
    }
}

/// Attach an `Identity` to every request. A missing, malformed or expired
/// token leaves the request anonymous; this layer never rejects.
pub async fn authenticate_jwt(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let identity = match extract_bearer(request.headers()) {
        None => Identity::Anonymous,
        Some(token) => match state.tokens.decode(token) {
            Ok(claims) => Identity::User(claims.into()),
            Err(e) => {
                tracing::warn!("Ignoring rejected bearer token: {}", e);
                Identity::Anonymous
            }
        },
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

pub async fn ensure_logged_in(request: Request, next: Next) -> Result<Response, ApiError> {
    identity_of(&request).require_logged_in()?;
    Ok(next.run(request).await)
}

pub async fn ensure_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    identity_of(&request).require_admin()?;
    Ok(next.run(request).await)
}

/// Gate for `/users/:username/...` routes.
pub async fn ensure_correct_user_or_admin(
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let username = params.get("username").map(String::as_str).unwrap_or_default();
    identity_of(&request).require_self_or_admin(username)?;
    Ok(next.run(request).await)
}

fn identity_of(request: &Request) -> Identity {
    request.extensions().get::<Identity>().cloned().unwrap_or_default()
}

/// The token from an `Authorization: Bearer <token>` header, if well formed.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
