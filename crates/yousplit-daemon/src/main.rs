//! yousplit-daemon binary entry point.

use std::sync::Arc;

use tracing::{error, info};

use yousplit_daemon::config::DaemonConfig;
use yousplit_daemon::rpc::RpcServer;
use yousplit_daemon::DaemonState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.advanced.log_level))?,
        )
        .init();

    info!("YouSplit daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Open database
    let db_path = data_dir.join("yousplit.db");
    let conn = yousplit_db::open(&db_path)?;

    // 4. Restore or construct the pool
    let state = Arc::new(DaemonState::bootstrap(config, conn)?);

    // 5. Start IPC server
    let socket_path = state.config.socket_path();
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 6. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
