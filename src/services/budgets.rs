//! Budget entries and their public visibility, kept consistent with each other.
//!
//! Every operation takes the caller's own user id and re-derives ownership
//! from storage. Writes that touch more than one row run in a single
//! transaction; an early return drops the transaction, which rolls it back.
//! The first statement of every transaction is a write, so SQLite takes the
//! write lock up front and a busy writer is waited on instead of failing.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, warn};

use crate::database::db::{budgets, categories, permissions};
use crate::database::models::{BudgetView, Category, PublicBudget};
use crate::error::{ServiceError, ServiceResult};
use crate::messages;

/// The mutable part of an entry, as submitted by its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetDraft {
    pub category_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub make_public: bool,
}

impl BudgetDraft {
    /// Builds a draft from raw form fields. Zero date components are rejected
    /// as well as combinations that are not a calendar date.
    pub fn from_form(
        category: &str,
        amount: &str,
        year: i32,
        month: u32,
        day: u32,
        make_public: bool,
    ) -> ServiceResult<Self> {
        let category_id = category
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ServiceError::validation(messages::INVALID_CATEGORY))?;

        let amount = Decimal::from_str(amount.trim())
            .ok()
            .filter(|amount| *amount > Decimal::ZERO)
            .ok_or_else(|| ServiceError::validation(messages::INVALID_AMOUNT))?;

        if year == 0 || month == 0 || day == 0 {
            return Err(ServiceError::validation(messages::INVALID_DATE));
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| ServiceError::validation(messages::INVALID_DATE))?;

        Ok(Self {
            category_id,
            amount,
            date,
            make_public,
        })
    }

    /// Re-checked before every write, whoever built the draft.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.category_id <= 0 {
            return Err(ServiceError::validation(messages::INVALID_CATEGORY));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ServiceError::validation(messages::INVALID_AMOUNT));
        }
        if self.date.year() < 1 {
            return Err(ServiceError::validation(messages::INVALID_DATE));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct BudgetService {
    pool: Pool<Sqlite>,
}

impl BudgetService {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Inserts the entry and, if requested, its public grant. Either both
    /// land or neither does.
    pub async fn create(&self, owner_id: i64, draft: &BudgetDraft) -> ServiceResult<i64> {
        draft.validate()?;

        let mut tx = self.pool.begin().await?;

        let budget_id =
            budgets::insert(&mut *tx, owner_id, draft.category_id, draft.amount, draft.date)
                .await
                .map_err(category_violation)?;

        if draft.make_public {
            permissions::grant(&mut *tx, budget_id).await?;
        }

        tx.commit().await?;

        info!(budget_id, owner_id, public = draft.make_public, "Created budget entry");
        Ok(budget_id)
    }

    /// Rewrites the entry and reconciles its grant with `draft.make_public`.
    pub async fn update(
        &self,
        budget_id: i64,
        caller_id: i64,
        draft: &BudgetDraft,
    ) -> ServiceResult<()> {
        self.ensure_owner(budget_id, caller_id).await?;
        draft.validate()?;

        let mut tx = self.pool.begin().await?;

        let updated = budgets::update_fields(
            &mut *tx,
            budget_id,
            caller_id,
            draft.category_id,
            draft.amount,
            draft.date,
        )
        .await
        .map_err(category_violation)?;
        if updated == 0 {
            warn!(budget_id, caller_id, "Entry changed hands during update");
            return Err(ServiceError::Forbidden);
        }

        if draft.make_public {
            permissions::grant(&mut *tx, budget_id).await?;
        } else {
            permissions::revoke(&mut *tx, budget_id).await?;
        }

        tx.commit().await?;

        info!(budget_id, public = draft.make_public, "Updated budget entry");
        Ok(())
    }

    /// Removes the grant first, then the entry.
    pub async fn delete(&self, budget_id: i64, caller_id: i64) -> ServiceResult<()> {
        self.ensure_owner(budget_id, caller_id).await?;

        let mut tx = self.pool.begin().await?;

        permissions::revoke(&mut *tx, budget_id).await?;

        if budgets::delete_by_id(&mut *tx, budget_id, caller_id).await? == 0 {
            warn!(budget_id, caller_id, "Entry changed hands during delete");
            return Err(ServiceError::Forbidden);
        }

        tx.commit().await?;

        info!(budget_id, "Deleted budget entry");
        Ok(())
    }

    /// Flips the entry between public and private and returns the new state.
    /// Both branches carry the owner predicate, so a caller who does not own
    /// the entry changes nothing and gets `Forbidden`.
    pub async fn toggle_visibility(&self, budget_id: i64, caller_id: i64) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;

        let now_public = if permissions::revoke_owned(&mut *tx, budget_id, caller_id).await? {
            false
        } else if permissions::grant_owned(&mut *tx, budget_id, caller_id).await? {
            true
        } else {
            warn!(budget_id, caller_id, "Visibility toggle on entry not owned by caller");
            return Err(ServiceError::Forbidden);
        };

        tx.commit().await?;

        info!(budget_id, public = now_public, "Toggled budget visibility");
        Ok(now_public)
    }

    /// A non-owner gets `Forbidden` whether or not the id exists.
    pub async fn get(&self, budget_id: i64, caller_id: i64) -> ServiceResult<BudgetView> {
        let Some(entry) = budgets::find_owned(&self.pool, budget_id, caller_id).await? else {
            debug!(budget_id, caller_id, "No owned entry");
            return Err(ServiceError::Forbidden);
        };
        let is_public = permissions::is_public(&self.pool, budget_id).await?;

        Ok(BudgetView { entry, is_public })
    }

    pub async fn list_for_owner(&self, owner_id: i64) -> ServiceResult<Vec<BudgetView>> {
        Ok(budgets::list_by_owner(&self.pool, owner_id).await?)
    }

    pub async fn list_all_public(&self) -> ServiceResult<Vec<PublicBudget>> {
        Ok(budgets::list_all_public(&self.pool).await?)
    }

    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(categories::list_categories(&self.pool).await?)
    }

    // Read outside the write transaction; the writes repeat the owner predicate.
    async fn ensure_owner(&self, budget_id: i64, caller_id: i64) -> ServiceResult<()> {
        match budgets::owner_of(&self.pool, budget_id).await? {
            Some(owner_id) if owner_id == caller_id => Ok(()),
            Some(owner_id) => {
                warn!(budget_id, owner_id, caller_id, "Caller does not own budget entry");
                Err(ServiceError::Forbidden)
            }
            None => {
                debug!(budget_id, caller_id, "Budget entry not found");
                Err(ServiceError::Forbidden)
            }
        }
    }
}

// The owner comes from the session, so the category is the reference that can dangle.
fn category_violation(err: sqlx::Error) -> ServiceError {
    if ServiceError::is_foreign_key_violation(&err) {
        ServiceError::validation(messages::INVALID_CATEGORY)
    } else {
        ServiceError::Storage(err)
    }
}
