use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use jobboard::auth::jwt::JwtService;
use jobboard::bootstrap::{init_tracing, open_storage, open_store};
use jobboard::config::AppConfig;
use jobboard::directory;
use jobboard::routes;
use jobboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    info!(
        component = "server",
        store_backend = ?config.store_backend,
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        s3_bucket = config.s3_bucket.as_deref().unwrap_or("<local>"),
        sweep_interval_seconds = config.expiry_sweep_interval_seconds,
        "loaded configuration"
    );

    let jwt = JwtService::from_config(&config)?;
    let store = open_store(&config).await?;
    let storage = open_storage(&config, &jwt).await;
    let state = AppState::new(store, config, storage, jwt);

    if state.config.expiry_sweep_interval_seconds > 0 {
        let period = Duration::from_secs(state.config.expiry_sweep_interval_seconds);
        tokio::spawn(sweep_loop(state.clone(), period));
    }

    let listen_addr: SocketAddr =
        format!("{}:{}", state.config.server_host, state.config.server_port).parse()?;
    let router = routes::create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    info!("listening on {}", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn sweep_loop(state: AppState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Err(err) = directory::sweep_expired(state.store.as_ref(), directory::now()).await {
            warn!(error = %err, "expiry sweep failed");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
