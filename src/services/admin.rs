use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::database::db::{budgets, permissions, users};
use crate::database::models::UserSummary;
use crate::error::{ServiceError, ServiceResult};

/// Privileged account management. Callers must have passed
/// [`SessionGate::require_admin`](super::SessionGate::require_admin).
#[derive(Clone)]
pub struct AdminService {
    pool: Pool<Sqlite>,
}

impl AdminService {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<UserSummary>> {
        Ok(users::list_users(&self.pool).await?)
    }

    /// Deletes grants, then entries, then the user, in one transaction. An
    /// unknown id rolls back with `NotFound`.
    pub async fn delete_user(&self, target_id: i64, caller_admin_id: i64) -> ServiceResult<()> {
        if target_id == caller_admin_id {
            return Err(ServiceError::SelfDeletion);
        }

        let mut tx = self.pool.begin().await?;

        let grants = permissions::revoke_for_user(&mut *tx, target_id).await?;
        let entries = budgets::delete_by_owner(&mut *tx, target_id).await?;
        if users::delete_user(&mut *tx, target_id).await? == 0 {
            return Err(ServiceError::NotFound);
        }

        tx.commit().await?;

        info!(target_id, caller_admin_id, grants, entries, "Deleted user and their data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{connection, migrate};
    use crate::services::{BudgetDraft, BudgetService};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    async fn setup() -> (Pool<Sqlite>, AdminService, BudgetService) {
        let pool = connection::memory_pool().await.unwrap();
        migrate::prepare(&pool).await.unwrap();
        (pool.clone(), AdminService::new(pool.clone()), BudgetService::new(pool))
    }

    fn draft(make_public: bool) -> BudgetDraft {
        BudgetDraft {
            category_id: 1,
            amount: Decimal::from(10),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            make_public,
        }
    }

    async fn grant_count(pool: &Pool<Sqlite>) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM permissions").fetch_one(pool).await.unwrap()
    }

    #[tokio::test]
    async fn users_are_listed_by_username() {
        let (pool, admin, _) = setup().await;
        users::insert_user(&pool, "mallory", "h", false).await.unwrap();
        users::insert_user(&pool, "alice", "h", false).await.unwrap();
        users::insert_user(&pool, "root", "h", true).await.unwrap();

        let listed = admin.list_users().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "mallory", "root"]);
        assert!(listed[2].is_admin);
        assert!(!listed[0].is_admin);
    }

    #[tokio::test]
    async fn self_deletion_is_refused_and_nothing_changes() {
        let (pool, admin, budgets_svc) = setup().await;
        let root = users::insert_user(&pool, "root", "h", true).await.unwrap();
        budgets_svc.create(root, &draft(true)).await.unwrap();

        let err = admin.delete_user(root, root).await.unwrap_err();
        assert!(matches!(err, ServiceError::SelfDeletion));

        assert!(users::user_exists(&pool, root).await.unwrap());
        assert_eq!(budgets::count_by_owner(&pool, root).await.unwrap(), 1);
        assert_eq!(grant_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_without_orphans() {
        let (pool, admin, budgets_svc) = setup().await;
        let root = users::insert_user(&pool, "root", "h", true).await.unwrap();
        let alice = users::insert_user(&pool, "alice", "h", false).await.unwrap();
        let bob = users::insert_user(&pool, "bob", "h", false).await.unwrap();

        budgets_svc.create(alice, &draft(true)).await.unwrap();
        budgets_svc.create(alice, &draft(false)).await.unwrap();
        budgets_svc.create(alice, &draft(true)).await.unwrap();
        let bobs = budgets_svc.create(bob, &draft(true)).await.unwrap();

        admin.delete_user(alice, root).await.unwrap();

        assert!(!users::user_exists(&pool, alice).await.unwrap());
        assert_eq!(budgets::count_by_owner(&pool, alice).await.unwrap(), 0);

        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM permissions p \
             LEFT JOIN budgets b ON p.budget_id = b.id WHERE b.id IS NULL",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(orphans, 0);

        // Bob is untouched.
        assert_eq!(grant_count(&pool).await, 1);
        assert!(permissions::is_public(&pool, bobs).await.unwrap());
        let public = budgets_svc.list_all_public().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].username, "bob");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (pool, admin, _) = setup().await;
        let root = users::insert_user(&pool, "root", "h", true).await.unwrap();

        let err = admin.delete_user(root + 100, root).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deletions_on_a_file_database_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("admin.db").display());
        let pool = connection::get_db_pool(&url).await.unwrap();
        migrate::prepare(&pool).await.unwrap();
        let admin = AdminService::new(pool.clone());
        let budgets_svc = BudgetService::new(pool.clone());

        let root = users::insert_user(&pool, "root", "h", true).await.unwrap();
        let mut targets = Vec::new();
        for n in 0..10 {
            let id = users::insert_user(&pool, &format!("user{}", n), "h", false).await.unwrap();
            budgets_svc.create(id, &draft(n % 2 == 0)).await.unwrap();
            targets.push(id);
        }

        let mut tasks = tokio::task::JoinSet::new();
        for &target in &targets {
            let admin = admin.clone();
            tasks.spawn(async move { admin.delete_user(target, root).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(admin.list_users().await.unwrap().len(), 1);
        assert_eq!(grant_count(&pool).await, 0);
    }
}
