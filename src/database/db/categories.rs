use sqlx::{Executor, Pool, Sqlite};

use crate::database::models::Category;

/// The reference categories every installation starts with.
pub const FIXED_CATEGORIES: [&str; 6] =
    ["Mat", "Boende", "Transport", "Nöje", "Sparande", "Övrigt"];

pub async fn seed_categories(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for name in FIXED_CATEGORIES {
        sqlx::query("INSERT INTO categories (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}

pub async fn list_categories<'e, E>(exec: E) -> Result<Vec<Category>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
        .fetch_all(exec)
        .await
}
