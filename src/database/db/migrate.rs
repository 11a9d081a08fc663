use anyhow::Result;
use sqlx::{Pool, Sqlite};

use super::categories;

pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Migrations plus the fixed category list. Safe to call on every start.
pub async fn prepare(pool: &Pool<Sqlite>) -> Result<()> {
    run_migrations(pool).await?;
    categories::seed_categories(pool).await?;
    Ok(())
}
