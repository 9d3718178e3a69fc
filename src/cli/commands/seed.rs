use serde_json::json;
use sqlx::Executor;

use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};

const SEED_SQL: &str = include_str!("../../../sql/seed.sql");

pub async fn handle(ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    (&ctx.pool).execute(SEED_SQL).await?;

    let companies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
        .fetch_one(&ctx.pool)
        .await?;
    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs").fetch_one(&ctx.pool).await?;

    tracing::info!(companies, jobs, "Seed data loaded");
    output_success(
        &output_format,
        &format!("Seeded database ({} companies, {} jobs)", companies, jobs),
        Some(json!({ "companies": companies, "jobs": jobs })),
    )
}
