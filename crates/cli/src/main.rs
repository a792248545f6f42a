//! Storefront CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! storefront-cli migrate
//!
//! # Create a staff account
//! storefront-cli user create -u admin -e admin@example.com -p 'long passphrase' --staff
//!
//! # Insert demo catalog data (safe to run repeatedly)
//! storefront-cli seed
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create a user and its customer profile
//! - `seed` - Seed the catalog with demo data

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "storefront-cli")]
#[command(author, version, about = "Storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the catalog with demo collections, products, promotions and tags
    Seed,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters, not entirely numeric)
        #[arg(short, long)]
        password: String,

        /// Grant staff permissions
        #[arg(long)]
        staff: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                staff,
            } => {
                commands::user::create(username, email, password, staff).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_create() {
        let cli = Cli::try_parse_from([
            "storefront-cli",
            "user",
            "create",
            "-u",
            "alice",
            "-e",
            "alice@example.com",
            "-p",
            "hunter2hunter2",
            "--staff",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        let Commands::User {
            action:
                UserAction::Create {
                    username, staff, ..
                },
        } = cli.command
        else {
            panic!("expected user create");
        };
        assert_eq!(username, "alice");
        assert!(staff);
    }

    #[test]
    fn test_user_create_requires_password() {
        assert!(
            Cli::try_parse_from(["storefront-cli", "user", "create", "-u", "a", "-e", "a@b.co"])
                .is_err()
        );
    }
}
