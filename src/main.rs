use anyhow::Context;
use smart_dating_optimizer::{
    app::{build_app, serve},
    config::{AppConfig, StorageBackend, DEFAULT_JWT_SECRET},
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "smart_dating_optimizer=debug,axum=info,tower_http=info";

/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env()?;
    if config.jwt.secret == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    let app_state = match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory user store; data is lost on restart");
            AppState::in_memory(config.clone())
        }
        StorageBackend::Postgres => {
            let db = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(&config.database_url)
                .await
                .context("connect to database")?;
            tracing::info!("database connected");

            if config.run_migrations {
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
            }
            AppState::postgres(config.clone(), db)
        }
    };

    serve(build_app(app_state), &config).await
}
