use sqlx::{Executor, Sqlite};

use crate::database::models::{User, UserSummary};

pub async fn find_by_username<'e, E>(exec: E, username: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, is_admin
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(exec)
    .await
}

pub async fn find_admin_by_username<'e, E>(
    exec: E,
    username: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, is_admin
        FROM users
        WHERE username = ? AND is_admin = 1
        "#,
    )
    .bind(username)
    .fetch_optional(exec)
    .await
}

#[cfg(test)]
pub async fn user_exists<'e, E>(exec: E, user_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(exec)
        .await?;
    Ok(count > 0)
}

pub async fn insert_user<'e, E>(
    exec: E,
    username: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO users (username, password_hash, is_admin)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(is_admin)
    .fetch_one(exec)
    .await
}

pub async fn list_users<'e, E>(exec: E) -> Result<Vec<UserSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, is_admin FROM users ORDER BY username ASC",
    )
    .fetch_all(exec)
    .await
}

pub async fn delete_user<'e, E>(exec: E, user_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected())
}
