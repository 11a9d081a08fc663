// src/main.rs
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use budget_tracker::config::{self, Config};
use budget_tracker::services::CredentialStore;
use budget_tracker::{backend, database};

#[derive(Parser)]
#[command(name = "budget-tracker", about = "Personal and shared budget tracker")]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create an admin account directly in the database
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let pool = database::db::connection::get_db_pool(&config.database_url).await?;
    database::db::migrate::prepare(&pool).await?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = config::parse_addr(&bind)?;
            }
            tracing::info!("Starting backend server");
            backend::run_server(pool, config).await?;
        }
        Command::CreateAdmin { username, password } => {
            let store = CredentialStore::new(pool, config.bcrypt_cost);
            let user_id = store.register_admin(&username, &password).await?;
            println!("Created admin '{}' with id {}", username, user_id);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "budget_tracker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
