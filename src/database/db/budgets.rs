use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::database::models::{BudgetEntry, BudgetView, PublicBudget, EVERYONE};

/*==========Budget Ledger=========== */

// Amounts are stored as TEXT so no precision is lost on the way through SQLite.
fn entry_from_row(row: &SqliteRow) -> Result<BudgetEntry, sqlx::Error> {
    let amount_text: String = row.try_get("amount")?;
    let amount = Decimal::from_str(&amount_text).map_err(|e| {
        sqlx::Error::Decode(format!("Invalid Decimal format for amount: {}", e).into())
    })?;

    Ok(BudgetEntry {
        id: row.try_get("id")?,
        owner_id: row.try_get("user_id")?,
        category_id: row.try_get("category_id")?,
        category_name: row.try_get("category_name")?,
        amount,
        date: row.try_get("date")?,
    })
}

pub async fn insert<'e, E>(
    exec: E,
    owner_id: i64,
    category_id: i64,
    amount: Decimal,
    date: NaiveDate,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO budgets (category_id, amount, user_id, date)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(category_id)
    .bind(amount.to_string())
    .bind(owner_id)
    .bind(date)
    .fetch_one(exec)
    .await
}

/// Rewrites the mutable fields. The owner is part of the predicate, so a row
/// that is not (or no longer) owned by `owner_id` is left untouched and the
/// returned count is zero.
pub async fn update_fields<'e, E>(
    exec: E,
    budget_id: i64,
    owner_id: i64,
    category_id: i64,
    amount: Decimal,
    date: NaiveDate,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE budgets
        SET category_id = ?, amount = ?, date = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(category_id)
    .bind(amount.to_string())
    .bind(date)
    .bind(budget_id)
    .bind(owner_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_by_id<'e, E>(exec: E, budget_id: i64, owner_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM budgets WHERE id = ? AND user_id = ?")
        .bind(budget_id)
        .bind(owner_id)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_by_owner<'e, E>(exec: E, owner_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM budgets WHERE user_id = ?")
        .bind(owner_id)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
pub async fn find_by_id<'e, E>(exec: E, budget_id: i64) -> Result<Option<BudgetEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        SELECT b.id, b.user_id, b.category_id, c.name AS category_name, b.amount, b.date
        FROM budgets b
        LEFT JOIN categories c ON b.category_id = c.id
        WHERE b.id = ?
        "#,
    )
    .bind(budget_id)
    .fetch_optional(exec)
    .await?
    .map(|row| entry_from_row(&row))
    .transpose()
}

/// Existence and ownership in one lookup: `None` covers both "no such entry"
/// and "someone else's entry".
pub async fn find_owned<'e, E>(
    exec: E,
    budget_id: i64,
    owner_id: i64,
) -> Result<Option<BudgetEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        SELECT b.id, b.user_id, b.category_id, c.name AS category_name, b.amount, b.date
        FROM budgets b
        LEFT JOIN categories c ON b.category_id = c.id
        WHERE b.id = ? AND b.user_id = ?
        "#,
    )
    .bind(budget_id)
    .bind(owner_id)
    .fetch_optional(exec)
    .await?
    .map(|row| entry_from_row(&row))
    .transpose()
}

pub async fn owner_of<'e, E>(exec: E, budget_id: i64) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT user_id FROM budgets WHERE id = ?")
        .bind(budget_id)
        .fetch_optional(exec)
        .await
}

pub async fn list_by_owner<'e, E>(exec: E, owner_id: i64) -> Result<Vec<BudgetView>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        SELECT b.id, b.user_id, b.category_id, c.name AS category_name, b.amount, b.date,
               CASE WHEN p.id IS NOT NULL THEN 1 ELSE 0 END AS is_public
        FROM budgets b
        LEFT JOIN categories c ON b.category_id = c.id
        LEFT JOIN permissions p ON b.id = p.budget_id AND p.user_id = ?
        WHERE b.user_id = ?
        ORDER BY b.date DESC, b.id DESC
        "#,
    )
    .bind(EVERYONE)
    .bind(owner_id)
    .fetch_all(exec)
    .await?
    .into_iter()
    .map(|row| {
        let is_public: i64 = row.try_get("is_public")?;
        Ok(BudgetView {
            entry: entry_from_row(&row)?,
            is_public: is_public != 0,
        })
    })
    .collect::<Result<Vec<BudgetView>, sqlx::Error>>()
}

/// Every entry carrying an "everyone" grant, newest date first.
pub async fn list_all_public<'e, E>(exec: E) -> Result<Vec<PublicBudget>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        SELECT b.id, b.user_id, b.category_id, c.name AS category_name, b.amount, b.date,
               u.username
        FROM budgets b
        JOIN permissions p ON b.id = p.budget_id AND p.user_id = ?
        JOIN users u ON b.user_id = u.id
        LEFT JOIN categories c ON b.category_id = c.id
        ORDER BY b.date DESC, b.id DESC
        "#,
    )
    .bind(EVERYONE)
    .fetch_all(exec)
    .await?
    .into_iter()
    .map(|row| {
        Ok(PublicBudget {
            entry: entry_from_row(&row)?,
            username: row.try_get("username")?,
            is_public: true,
        })
    })
    .collect::<Result<Vec<PublicBudget>, sqlx::Error>>()
}

#[cfg(test)]
pub async fn count_by_owner<'e, E>(exec: E, owner_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM budgets WHERE user_id = ?")
        .bind(owner_id)
        .fetch_one(exec)
        .await
}
