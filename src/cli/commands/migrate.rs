use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};
use crate::database::DatabaseManager;

pub async fn handle(ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    DatabaseManager::migrate(&ctx.pool).await?;
    output_success(&output_format, "Migrations applied", None)
}
