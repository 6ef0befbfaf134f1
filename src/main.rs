use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use upload_ingest::{config::Config, models::StorageEvent, routes::{self, create_router}, utils::init_logger, AppState};

#[derive(Parser)]
#[command(name = "upload-ingest", version, about = "Presigned CSV uploads and user record ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Handle one storage notification and exit
    Ingest {
        /// Path to the S3 event JSON, or `-` for stdin
        #[arg(long)]
        event: PathBuf,
    },
    /// Issue one presigned upload URL and exit
    Presign {
        #[arg(long)]
        filename: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let pool = upload_ingest::db::create_pool(&config.database);
    if config.database.run_migrations {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations completed");
    }

    let state = AppState::from_config(config.clone(), pool)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state, &config).await,
        Command::Ingest { event } => {
            let event = read_event(&event)?;
            let summary = state.ingest.handle_event(&event).await?;
            println!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Command::Presign { filename } => {
            let params: HashMap<String, String> =
                filename.into_iter().map(|f| ("filename".to_string(), f)).collect();
            let response = state.presign.presign(&params).await?;
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
    }
}

async fn serve(state: AppState, config: &Config) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = routes::bind(&config.server).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

fn read_event(path: &Path) -> anyhow::Result<StorageEvent> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}
