use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use license_panel::config::Config;
use license_panel::services::license_service::LicenseService;
use license_panel::{build_router, cli, AppState};

#[derive(Parser)]
#[command(name = "license-panel")]
#[command(about = "License key issuing and validation server", long_about = None)]
struct Cli {
    /// Path to a TOML config file (otherwise well-known paths, then environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve,
    /// Manage licenses from the command line
    Licenses {
        #[command(subcommand)]
        subcommand: LicenseCommands,
    },
}

#[derive(Subcommand)]
enum LicenseCommands {
    /// List all licenses, newest first
    List,
    /// Create a new license and print its key
    Create {
        #[arg(long)]
        owner: Option<String>,
        /// Days until expiry; omit for a license that never expires
        #[arg(long)]
        days: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Block an active license or unblock a blocked one
    Toggle { id: i64 },
    /// Delete a license permanently
    Delete { id: i64 },
    /// Print the validation verdict for a key
    Check { key: String },
}

fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "license_panel=debug,license_db=debug,tower_http=info,sqlx=warn".into());

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::never(dir, "server.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    let (config, source) = Config::load(cli.config.as_deref())?;
    let _guard = init_tracing(&config)?;
    tracing::info!("Loaded config from {}", source);

    let pool = license_db::connect(&config.db_path).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, pool).await?,
        Commands::Licenses { subcommand } => {
            let service = LicenseService::new(pool);
            match subcommand {
                LicenseCommands::List => cli::list_licenses(&service).await?,
                LicenseCommands::Create { owner, days, notes } => {
                    cli::create_license(&service, owner.as_deref(), days.as_deref(), notes.as_deref()).await?
                }
                LicenseCommands::Toggle { id } => cli::toggle_license(&service, id).await?,
                LicenseCommands::Delete { id } => cli::delete_license(&service, id).await?,
                LicenseCommands::Check { key } => cli::check_license(&service, &key).await?,
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config, pool: sqlx::SqlitePool) -> Result<()> {
    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY is not set; using the development default. Set it in production.");
    }

    let addr = config.listen_addr()?;
    let app = build_router(AppState::new(config, pool));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
