//! Persistence gateway for pipeline runs and their audit trail.
//!
//! [`PersistenceGateway`] is the narrow write/read surface the pipeline,
//! tool manager, and hook dispatcher use. Two implementations ship:
//!
//! - [`MemoryGateway`] keeps everything in process; used by default and in tests.
//! - [`PgGateway`] writes through the repositories in [`repositories`].

pub mod error;
pub mod gateway;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repositories;

pub use error::GatewayError;
pub use gateway::{PersistenceGateway, SharedGateway};
pub use memory::MemoryGateway;
pub use postgres::PgGateway;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the bundled schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
