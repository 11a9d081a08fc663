pub mod admin;
pub mod budgets;
pub mod credentials;
pub mod session;

pub use admin::AdminService;
pub use budgets::{BudgetDraft, BudgetService};
pub use credentials::CredentialStore;
pub use session::{
    AccessDenied, LoginOutcome, SessionContext, SessionGate, SessionState, ThrottlePolicy,
};
