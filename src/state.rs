use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{JwtError, TokenCodec};
use crate::config::AppConfig;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Result<Self, JwtError> {
        let tokens = TokenCodec::new(&config.security)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        })
    }
}
