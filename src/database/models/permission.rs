use sqlx::FromRow;

/// Grantee id meaning "visible to everyone". Never a row in `users`.
pub const EVERYONE: i64 = 0;

/// The only permission type a grant carries.
pub const VIEW: &str = "View";

#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct VisibilityGrant {
    pub id: i64,
    pub budget_id: i64,
    pub user_id: i64,
    pub permission_type: String,
}
