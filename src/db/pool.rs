use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Create a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Creating database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

/// Connect and migrate, or return `None` so the SQL shim takes over
pub async fn connect_or_fallback(database_url: Option<&str>) -> Option<PgPool> {
    let Some(url) = database_url else {
        tracing::warn!("DATABASE_URL not set, relational queries use the in-memory SQL shim");
        return None;
    };

    let pool = match create_pool(url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Postgres unavailable ({}), falling back to the in-memory SQL shim", e);
            return None;
        }
    };

    tracing::info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::warn!("Migrations failed ({}), falling back to the in-memory SQL shim", e);
        return None;
    }
    tracing::info!("Migrations complete");

    Some(pool)
}
