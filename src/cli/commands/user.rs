use clap::Subcommand;
use serde_json::json;
use validator::Validate;

use crate::cli::utils::{output_success, output_table};
use crate::cli::{CliContext, OutputFormat};
use crate::database::models::{NewUser, UserRepository};
use crate::database::Repository;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user")]
    Create {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (5-20 characters)")]
        password: String,
        #[arg(long, help = "First name")]
        first_name: String,
        #[arg(long, help = "Last name")]
        last_name: String,
        #[arg(long, help = "Email address")]
        email: String,
        #[arg(long, help = "Grant admin rights")]
        admin: bool,
    },

    #[command(about = "List all users")]
    List,
}

pub async fn handle(cmd: UserCommands, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let repository = UserRepository::new(ctx.pool.clone());

    match cmd {
        UserCommands::Create { username, password, first_name, last_name, email, admin } => {
            let new_user = NewUser {
                username,
                password,
                first_name,
                last_name,
                email,
                is_admin: admin,
            };
            new_user.validate()?;

            let user = repository.create(new_user).await?;
            output_success(
                &output_format,
                &format!("Created user '{}'{}", user.username, if user.is_admin { " (admin)" } else { "" }),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::List => {
            let users = repository.find_all(()).await?;
            let rows = users
                .iter()
                .map(|u| {
                    vec![
                        u.username.clone(),
                        format!("{} {}", u.first_name, u.last_name),
                        u.email.clone(),
                        if u.is_admin { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect();
            output_table(
                &output_format,
                "users",
                &["USERNAME", "NAME", "EMAIL", "ADMIN"],
                rows,
                serde_json::to_value(&users)?,
            )
        }
    }
}
