// src/main.rs

use std::{sync::Arc, time::Duration};

use quizhub::{
    config::Config,
    models::user::ROLE_ADMIN,
    repository::{MemoryRepository, PgRepository, QuizRepository},
    routes,
    state::AppState,
    utils::password::hash_password,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
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

    let repo: Arc<dyn QuizRepository> = match &config.database_url {
        Some(url) => Arc::new(connect_postgres(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            Arc::new(MemoryRepository::new())
        }
    };

    // Seed Admin User
    if let Err(e) = seed_admin_user(repo.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let addr = config.bind_addr;
    let state = AppState { repo, config };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}

/// Connects with retries so the service can start alongside its database,
/// then applies migrations.
async fn connect_postgres(url: &str) -> Result<PgRepository, Box<dyn std::error::Error>> {
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(format!("Failed to connect to database after 5 retries: {}", e).into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    tracing::info!("Database connected...");

    let repo = PgRepository::new(pool);
    tracing::info!("Running migrations...");
    repo.migrate().await?;
    tracing::info!("Migrations applied successfully.");
    Ok(repo)
}

async fn seed_admin_user(
    repo: &dyn QuizRepository,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if repo.find_user_by_username(username).await?.is_none() {
            tracing::info!("Seeding admin user: {}", username);
            let hashed_password = hash_password(password)?;
            repo.create_user(username, &hashed_password, ROLE_ADMIN).await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
