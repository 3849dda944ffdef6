//! # Database Migration System
//!
//! Migrations live in `migrations/` as `NNNN_description.sql` and are embedded into the
//! binary at compile time. sqlx records applied versions in `_sqlx_migrations` and takes a
//! PostgreSQL advisory lock while applying, so services and parallel tests starting at the
//! same time do not race on schema creation.

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies the embedded schema migrations.
pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Run all outstanding migrations in order
    pub async fn run_all(pool: &PgPool) -> Result<(), sqlx::Error> {
        MIGRATOR.run(pool).await?;
        info!(
            migrations = MIGRATOR.iter().count(),
            "📋 Database schema up to date"
        );
        Ok(())
    }
}
