use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod admin;
mod cli;

use cosproxy_core::Core;
use cosproxy_pool::AccountPool;
use cosproxy_storage::AccountStorage;
use cosproxy_upstream::CosineClient;

use crate::admin::admin_router;
use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("cosproxy failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let dsn = resolve_dsn(&cli.dsn)?;

    let storage = AccountStorage::connect(&dsn).await?;
    info!(dsn = %dsn, "db connected");
    storage.sync().await?;

    let pool = AccountPool::new(Arc::new(storage.clone()));
    info!(accounts = pool.count().await?, "account pool ready");

    let client = CosineClient::new(cli.upstream_url.clone())?;
    info!(upstream = %cli.upstream_url, "upstream client ready");

    let core = Core::new(pool, Arc::new(client));
    let app = core
        .router()
        .merge(admin_router(storage, cli.admin_key.clone()));

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cosproxy=info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_dsn(input: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    if !input.trim().is_empty() {
        return Ok(input.to_string());
    }

    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or("failed to resolve executable directory")?;
    let db_path = dir.join("cosproxy.db");
    let db_path = db_path.to_string_lossy();
    let dsn = if db_path.starts_with('/') {
        let trimmed = db_path.trim_start_matches('/');
        format!("sqlite:///{}?mode=rwc", trimmed)
    } else {
        format!("sqlite://{}?mode=rwc", db_path)
    };
    Ok(dsn)
}
