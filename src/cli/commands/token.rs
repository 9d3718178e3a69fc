use serde_json::json;

use crate::auth::{AuthUser, TokenCodec};
use crate::cli::{CliContext, OutputFormat};
use crate::database::models::UserRepository;
use crate::database::Repository;

/// Print a signed token for `username`, for poking at the API by hand.
pub async fn handle(username: &str, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let detail = UserRepository::new(ctx.pool.clone()).get(&username.to_string()).await?;
    let codec = TokenCodec::new(&ctx.config.security)?;
    let token = codec.create_token(&AuthUser::from(&detail.user))?;

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "username": detail.user.username,
                    "isAdmin": detail.user.is_admin,
                    "token": token
                }))?
            );
        }
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
