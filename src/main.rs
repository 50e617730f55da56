//! Pulse - self-hosted observability backend

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::{
    api::{build_router, AppState},
    config::Config,
    db::{init_database, seed_admin_user},
    workers::spawn_monitor_scheduler,
};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = "0.1.0")]
#[command(about = "Self-hosted error tracking, tracing, uptime monitoring, and coverage")]
struct Cli {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Database path (overrides DB_PATH)
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; the process environment is enough otherwise
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let pool = init_database(&config.database_path).await?;
    seed_admin_user(
        &pool,
        config.admin_email.as_deref(),
        config.admin_password.as_deref(),
    )
    .await?;

    // Background workers: the batched writer starts with the state, the
    // uptime scheduler on its own
    let state = AppState::new(pool.clone(), config.clone());
    spawn_monitor_scheduler(pool);

    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", cli.host, config.port).parse()?;
    tracing::info!("Pulse starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
