// src/main.rs

use std::time::Duration;

use dotenvy::dotenv;
use quizdesk::{
    config::Config,
    error::AppError,
    models::question::QuizSet,
    quiz::catalog::Catalog,
    routes,
    state::AppState,
    store::Store,
};
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quizdesk.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Open the database with retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database opened...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let store = Store::sqlite(pool);

    if config.seed_default_quiz {
        if let Err(e) = seed_default_quiz(&store).await {
            tracing::error!("Failed to seed default quiz: {:?}", e);
        }
    }

    let state = AppState::new(store, config.clone()).expect("Failed to prepare admin credentials");

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listen address");

    axum::serve(listener, app).await.expect("Server error");
}

/// Installs the built-in quiz when the catalog has never been written.
async fn seed_default_quiz(store: &Store) -> Result<(), AppError> {
    let _gate = store.write_gate().await;
    let mut catalog = Catalog::load(store).await?;

    if catalog.is_empty() {
        let builtin = QuizSet::builtin();
        tracing::info!("Seeding default quiz: {}", builtin.name);
        catalog.create_category(&builtin.name, builtin.questions)?;
        catalog.save(store).await?;
    }
    Ok(())
}
