use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{auth, companies, health, jobs, users};
use crate::middleware::{authenticate_jwt, ensure_admin, ensure_correct_user_or_admin, ensure_logged_in};
use crate::state::AppState;

/// The full application router with its global layers.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        // Public
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .merge(auth_routes())
        .merge(company_routes())
        .merge(job_routes())
        .merge(user_routes())
        .fallback(not_found)
        // Global middleware
        .layer(from_fn_with_state(state.clone(), authenticate_jwt))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }

    router.with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token", post(auth::token))
        .route("/auth/register", post(auth::register))
        .route("/auth/whoami", get(auth::whoami.layer(from_fn(ensure_logged_in))))
}

fn company_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/companies",
            get(companies::list).post(companies::create.layer(from_fn(ensure_admin))),
        )
        .route(
            "/companies/:handle",
            get(companies::show)
                .patch(companies::update.layer(from_fn(ensure_admin)))
                .delete(companies::delete.layer(from_fn(ensure_admin))),
        )
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(jobs::list).post(jobs::create.layer(from_fn(ensure_admin))))
        .route(
            "/jobs/:id",
            get(jobs::show)
                .patch(jobs::update.layer(from_fn(ensure_admin)))
                .delete(jobs::delete.layer(from_fn(ensure_admin))),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(users::list.layer(from_fn(ensure_admin))).post(users::create.layer(from_fn(ensure_admin))),
        )
        .route(
            "/users/:username",
            get(users::show.layer(from_fn(ensure_correct_user_or_admin)))
                .patch(users::update.layer(from_fn(ensure_correct_user_or_admin)))
                .delete(users::delete.layer(from_fn(ensure_correct_user_or_admin))),
        )
        .route(
            "/users/:username/jobs/:id",
            post(users::apply.layer(from_fn(ensure_correct_user_or_admin))),
        )
}

/// Configured origins, or any origin when none are listed.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn not_found() -> impl IntoResponse {
    ApiError::not_found("Not Found")
}
