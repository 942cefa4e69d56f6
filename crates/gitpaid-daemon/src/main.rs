//! gitpaid-daemon: hosts the bounty topic manager and lookup service.
//!
//! Single OS process running a Tokio async runtime. The overlay host talks to
//! the daemon via newline-delimited JSON-RPC over a Unix socket.

mod commands;
mod config;
mod rpc;
mod tokens;

use std::sync::Arc;
use std::time::{Duration, Instant};

use gitpaid_lookup::BountyLookupService;
use gitpaid_topic::BountyTopicManager;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;
use crate::tokens::SigningTokenStore;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Admission filter.
    pub topic: BountyTopicManager,
    /// Projection store.
    pub lookup: BountyLookupService,
    /// Outstanding certificate signing tokens.
    pub tokens: Mutex<SigningTokenStore>,
    /// Process start, for uptime.
    pub started_at: Instant,
}

impl DaemonState {
    pub fn new(config: DaemonConfig, conn: rusqlite::Connection) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let lookup = BountyLookupService::with_labels(
            db.clone(),
            config.overlay.topic.clone(),
            config.overlay.service.clone(),
        );
        let tokens = SigningTokenStore::new(
            Duration::from_secs(config.certifier.token_ttl_secs),
            config.certifier.max_tokens,
        );
        Self {
            db,
            topic: BountyTopicManager::new(),
            lookup,
            tokens: Mutex::new(tokens),
            config,
            started_at: Instant::now(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("gitpaid={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!(
        node = %config.overlay.node_name,
        network = %config.overlay.network,
        "GitPaid daemon starting"
    );

    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = config.database_path();
    let conn = gitpaid_db::open(&db_path)?;
    info!("Database opened at {:?}", db_path);

    // 3. Build daemon state
    let socket_path = config.socket_path();
    let state = Arc::new(DaemonState::new(config, conn));

    // 4. Start IPC server
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());
    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 5. Run the RPC server until shutdown
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
