use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/garden-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Application tables, in creation order.
pub const TABLES: [&str; 3] = ["users", "garden_requests", "saved_schedules"];

/// Connect a pool to the configured database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    connect(config, &config.database_url, config.max_connections).await
}

async fn connect(config: &DbConfig, url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(url)
        .await
        .with_context(|| format!("failed to connect to database at {url}"))
}

/// Apply any pending embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run garden migrations")?;
    info!(count = MIGRATOR.iter().count(), "garden schema up to date");
    Ok(())
}

/// `CREATE DATABASE` cannot take a bind parameter, so names are restricted
/// to `[A-Za-z0-9_]`.
pub fn check_identifier(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {name:?} contains invalid characters");
    }
    Ok(())
}

/// Create the target database on first run. A database that already exists
/// is left alone.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    check_identifier(db_name)?;

    let maint = connect(config, &config.maintenance_url(), 1).await?;
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint)
            .await
            .context("failed to query pg_database")?;

    if exists {
        debug!(db = db_name, "database already exists");
    } else {
        maint
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    }

    maint.close().await;
    Ok(())
}

/// Row count per table in [`TABLES`] order.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table.to_string(), count));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(check_identifier("garden_test_1a2b").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("garden; DROP TABLE users").is_err());
        assert!(check_identifier("garden-prod").is_err());
    }
}
