#![allow(dead_code)]

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use jobly_api::auth::AuthUser;
use jobly_api::config::{AppConfig, Environment};
use jobly_api::database::models::{NewCompany, NewUser, CompanyRepository, UserRepository};
use jobly_api::database::{DatabaseManager, Repository};
use jobly_api::routes;
use jobly_api::state::AppState;

/// An API instance served in-process on its own port.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A signed token for `username`; the user need not exist.
    pub fn token(&self, username: &str, is_admin: bool) -> String {
        self.state
            .tokens
            .create_token(&AuthUser { username: username.to_string(), is_admin })
            .expect("token")
    }

    pub fn admin_token(&self) -> String {
        self.token("test-admin", true)
    }

    pub fn pool(&self) -> &PgPool {
        &self.state.pool
    }
}

/// Serve the router over `pool`.
pub async fn spawn_app(pool: PgPool) -> Result<TestServer> {
    let config = AppConfig::for_environment(Environment::Test);
    let state = AppState::new(pool, config)?;

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    let app = routes::app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        state,
    })
}

/// Serve the router over a pool that never connects unless a handler
/// reaches the database. Enough for gates and input validation.
pub async fn spawn_app_without_database() -> Result<TestServer> {
    let config = AppConfig::for_environment(Environment::Test);
    let pool = DatabaseManager::connect_lazy(&config.database)?;
    spawn_app(pool).await
}

/// A migrated test database, or `None` (and the test is skipped) when no
/// database is reachable. `TEST_DATABASE_URL` overrides the test profile.
pub async fn database() -> Option<PgPool> {
    let mut config = AppConfig::for_environment(Environment::Test).database;
    if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
        config.url = url;
    }

    let pool = match DatabaseManager::connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("skipping: test database unavailable ({})", e);
            return None;
        }
    };

    if let Err(e) = DatabaseManager::migrate(&pool).await {
        eprintln!("skipping: migrations failed ({})", e);
        return None;
    }
    Some(pool)
}

/// A short lowercase name unique to this run, e.g. `c-3f9a1b2c4d`.
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..10])
}

pub async fn create_company(pool: &PgPool) -> Result<String> {
    let handle = unique("c");
    CompanyRepository::new(pool.clone())
        .create(NewCompany {
            handle: handle.clone(),
            name: format!("Company {}", handle),
            description: "Test company".to_string(),
            num_employees: Some(10),
            logo_url: None,
        })
        .await?;
    Ok(handle)
}

pub async fn create_user(pool: &PgPool, is_admin: bool) -> Result<String> {
    let username = unique("u");
    UserRepository::new(pool.clone())
        .create(NewUser {
            username: username.clone(),
            password: "password1".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: format!("{}@example.com", username),
            is_admin,
        })
        .await?;
    Ok(username)
}

/// Status and parsed JSON body of a response.
pub async fn read(res: reqwest::Response) -> Result<(reqwest::StatusCode, Value)> {
    let status = res.status();
    let body = res.json::<Value>().await.context("response body was not JSON")?;
    Ok((status, body))
}
