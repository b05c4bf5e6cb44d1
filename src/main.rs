use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_gate::{
    AppState,
    config::{AppConfig, Env},
    create_router, ensure_admin,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};

/// main
///
/// Entry point: configuration, logging, credential store, then the HTTP server.
/// Invalid configuration and an unreachable database are fatal.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().unwrap_or_else(|err| {
        eprintln!("FATAL: invalid configuration: {err}");
        std::process::exit(1);
    });

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "user_gate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.env == Env::Local && config.jwt_secret == user_gate::config::LOCAL_JWT_SECRET {
        tracing::warn!("JWT_SECRET not set; using the local development secret");
    }

    // 3. Credential store
    let repo: RepositoryState = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .unwrap_or_else(|err| {
                    tracing::error!(error = %err, "FATAL: failed to connect to Postgres");
                    std::process::exit(1);
                });

            if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::error!(error = %err, "FATAL: database migration failed");
                std::process::exit(1);
            }

            tracing::info!("Connected to Postgres");
            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Arc::new(InMemoryRepository::new())
        }
    };

    if let Some(seed) = &config.bootstrap_admin {
        if let Err(err) = ensure_admin(&repo, seed, config.bcrypt_cost).await {
            tracing::error!(error = %err, "FATAL: could not create the bootstrap admin");
            std::process::exit(1);
        }
    }

    // 4. Router and server
    let port = config.port;
    let app = create_router(AppState::new(repo, config));

    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port, "FATAL: failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on 0.0.0.0:{port}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(error = %err, "server terminated");
        std::process::exit(1);
    }
}
