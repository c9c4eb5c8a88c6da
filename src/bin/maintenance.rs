use std::env;

use anyhow::Result;

use jobboard::{
    auth::jwt::JwtService,
    bootstrap::{init_tracing, open_storage, open_store},
    config::AppConfig,
    directory,
    report::REPORT_PREFIX,
};

const USAGE: &str = "Usage: maintenance <sweep-expired | check-storage>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("sweep-expired") => sweep_expired().await?,
        Some("check-storage") => check_storage().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        store_backend = ?config.store_backend,
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded configuration"
    );
    Ok(config)
}

async fn sweep_expired() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let latched = directory::sweep_expired(store.as_ref(), directory::now()).await?;
    println!("Latched {latched} expired jobs.");
    Ok(())
}

/// Round-trips a check object through the configured file store.
async fn check_storage() -> Result<()> {
    let config = load_config()?;
    let jwt = JwtService::from_config(&config)?;
    let storage = open_storage(&config, &jwt).await;

    let key = format!("{REPORT_PREFIX}/.check-{}", uuid::Uuid::new_v4());
    storage
        .put_object(&key, b"ok".to_vec(), Some("text/plain".into()), None)
        .await?;
    let read_back = storage.get_object(&key).await?;
    storage.delete_object(&key).await?;

    anyhow::ensure!(read_back == b"ok", "check object came back altered");
    println!("Storage round-trip succeeded.");
    Ok(())
}
