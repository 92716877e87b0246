use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::get_config;
use crate::error::Result;

/// Pool size comes from DATABASE_MAX_CONNECTIONS (default 10); every
/// operation is a single short transaction.
pub async fn create_pool() -> Result<PgPool> {
    let config = get_config();
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}
