//! Showcase CLI - Database migrations, seeding and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema + session store)
//! showcase migrate
//!
//! # Create an admin account
//! showcase user create -e admin@example.com -p 'correct horse battery' -r admin
//!
//! # Load demo users, stores and products
//! showcase seed demo --file crates/cli/seed/demo.yaml
//!
//! # Generate a key for SHOWCASE_ENCRYPTION_KEY
//! showcase keygen
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create a password account with a role
//! - `seed demo` - Seed the database from a YAML file
//! - `keygen` - Print a fresh base64 encryption key

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "showcase")]
#[command(author, version, about = "Showcase CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Print a new base64 key for `SHOWCASE_ENCRYPTION_KEY`
    Keygen,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new password account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (8-128 characters)
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Role (`user`, `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load demo users, stores and products
    Demo {
        /// Path to the YAML seed file
        #[arg(short, long, default_value = "crates/cli/seed/demo.yaml")]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showcase=info,showcase_server=info".into()),
        )
        .init();

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
                email,
                password,
                name,
                role,
            } => {
                commands::user::create(&email, &password, name.as_deref(), &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Demo { file } => commands::seed::demo(&file).await?,
        },
        Commands::Keygen => commands::keygen::run(),
    }
    Ok(())
}
