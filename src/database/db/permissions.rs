use sqlx::{Executor, Sqlite};

use crate::database::models::{EVERYONE, VIEW};

/*==========Visibility Ledger=========== */
// A row for (budget_id, EVERYONE) is the only thing that makes an entry public.

pub async fn is_public<'e, E>(exec: E, budget_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE budget_id = ? AND user_id = ?")
            .bind(budget_id)
            .bind(EVERYONE)
            .fetch_one(exec)
            .await?;
    Ok(count > 0)
}

/// Idempotent. The UNIQUE(budget_id, user_id) constraint turns a second grant
/// into a no-op, including one racing in from another connection.
/// Returns whether a row was inserted.
pub async fn grant<'e, E>(exec: E, budget_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO permissions (budget_id, user_id, permission_type)
        VALUES (?, ?, ?)
        ON CONFLICT(budget_id, user_id) DO NOTHING
        "#,
    )
    .bind(budget_id)
    .bind(EVERYONE)
    .bind(VIEW)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Idempotent. Returns whether a row was removed.
pub async fn revoke<'e, E>(exec: E, budget_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM permissions WHERE budget_id = ? AND user_id = ?")
        .bind(budget_id)
        .bind(EVERYONE)
        .execute(exec)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Like [`revoke`] but only touches an entry owned by `owner_id`.
pub async fn revoke_owned<'e, E>(
    exec: E,
    budget_id: i64,
    owner_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM permissions
        WHERE budget_id = ? AND user_id = ?
          AND budget_id IN (SELECT id FROM budgets WHERE id = ? AND user_id = ?)
        "#,
    )
    .bind(budget_id)
    .bind(EVERYONE)
    .bind(budget_id)
    .bind(owner_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Like [`grant`] but only for an entry owned by `owner_id`. `false` means
/// the entry is not the owner's, or it already was public.
pub async fn grant_owned<'e, E>(
    exec: E,
    budget_id: i64,
    owner_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO permissions (budget_id, user_id, permission_type)
        SELECT id, ?, ? FROM budgets WHERE id = ? AND user_id = ?
        ON CONFLICT(budget_id, user_id) DO NOTHING
        "#,
    )
    .bind(EVERYONE)
    .bind(VIEW)
    .bind(budget_id)
    .bind(owner_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Every grant on any of the user's entries plus any grant naming the user as grantee.
pub async fn revoke_for_user<'e, E>(exec: E, user_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM permissions
        WHERE budget_id IN (SELECT id FROM budgets WHERE user_id = ?)
           OR user_id = ?
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
pub async fn grants_for<'e, E>(
    exec: E,
    budget_id: i64,
) -> Result<Vec<crate::database::models::VisibilityGrant>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, crate::database::models::VisibilityGrant>(
        "SELECT id, budget_id, user_id, permission_type FROM permissions WHERE budget_id = ?",
    )
    .bind(budget_id)
    .fetch_all(exec)
    .await
}
