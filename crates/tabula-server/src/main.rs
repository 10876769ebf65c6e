//! Tabula game server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use tabula_core::config::{load_config, ServerConfig};
use tabula_core::tracing_init::init_tracing;
use tabula_server::games::GameRegistry;
use tabula_server::http::{build_router, AppState, OriginPolicy};
use tabula_server::hub::SessionHub;
use tabula_server::identity::IdentityService;
use tabula_server::storage::GameDatabase;

#[derive(Parser, Debug)]
#[command(name = "tabula-server")]
#[command(version, about = "Turn-based board-game session server")]
struct Args {
    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<String>,

    /// Path to the SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Path to a JSON config file.
    #[arg(long, env = "TABULA_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config: ServerConfig = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.listen_addr = addr;
    }
    if let Some(db_path) = args.db_path {
        config.database_path = Some(db_path);
    }
    if args.log_json {
        config.log_json = true;
    }

    init_tracing("tabula_server=info", config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        "Starting tabula-server"
    );

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening game database");
    let db = GameDatabase::open(&db_path).await?;

    let registry = GameRegistry::new(db.clone());
    let state = AppState {
        identity: IdentityService::new(db.clone(), config.base_url.clone()),
        registry: registry.clone(),
        hub: Arc::new(SessionHub::new(registry)),
        origins: Arc::new(OriginPolicy::new(config.allowed_origins.clone())),
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    db.checkpoint().await?;
    info!("Server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".tabula").join("tabula.db"))
}
