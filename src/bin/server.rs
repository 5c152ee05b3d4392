use std::net::SocketAddr;
use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use jobboard::auth::jwt::JwtService;
use jobboard::config::AppConfig;
use jobboard::db;
use jobboard::routes::create_router;
use jobboard::sms::{SmsVerifier, TwilioVerify, UnconfiguredSms};
use jobboard::state::AppState;
use jobboard::storage::LocalUploadStore;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        upload_root = %config.upload_root.display(),
        sms_enabled = config.twilio_account_sid.is_some(),
        "loaded server configuration"
    );

    let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
    run_migrations(&pool)?;

    tokio::fs::create_dir_all(&config.upload_root).await?;
    let uploads = Arc::new(LocalUploadStore::new(config.upload_root.clone()));

    let sms: Arc<dyn SmsVerifier> = match TwilioVerify::from_config(&config) {
        Some(twilio) => Arc::new(twilio),
        None => {
            tracing::warn!("Twilio credentials missing, phone verification disabled");
            Arc::new(UnconfiguredSms)
        }
    };

    let jwt = JwtService::from_config(&config)?;
    let state = AppState::new(pool, config, uploads, sms, jwt);

    let listen_addr: SocketAddr = {
        let config = state.config.clone();
        format!("{}:{}", config.server_host, config.server_port).parse()?
    };
    let router = create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn run_migrations(pool: &db::PgPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow::anyhow!("failed to run migrations: {err}"))?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
