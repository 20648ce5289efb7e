use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cantine::{config::Config, create_app, db, observability};

#[derive(Parser)]
#[command(name = "cantine", about = "School meal-service coordination backend")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Drop the local database file and re-apply migrations from scratch
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    observability::init_observability("cantine", &config.observability.log_level)?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Migrate => migrate(config).await,
        Command::Reset => reset(config).await,
    }
}

async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let pool = db::create_pool(&config.database.url, config.database.max_connections).await?;
    db::run_migrations(&pool).await?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let app = create_app(pool, config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn migrate(config: Config) -> Result<()> {
    let pool = db::create_pool(&config.database.url, config.database.max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Migrations applied");
    Ok(())
}

async fn reset(config: Config) -> Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite:") {
        if path != ":memory:" {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::info!(path, "Removed database file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("Failed to remove {path}")),
            }
        }
    }

    let pool = db::create_pool(&config.database.url, config.database.max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database reset");
    Ok(())
}
