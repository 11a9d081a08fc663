pub mod budget;
pub mod category;
pub mod permission;
pub mod user;

pub use budget::{BudgetEntry, BudgetView, PublicBudget};
pub use category::Category;
pub use permission::{VisibilityGrant, EVERYONE, VIEW};
pub use user::{User, UserSummary};
