use axum::{
    routing::{delete, get, post},
    Router,
};
use crate::backend::{handlers::{admin, auth, budgets}, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/session", get(auth::current_session))
        .route("/api/admin/login", post(auth::admin_login))
        .route("/api/setup/admin", post(auth::setup_admin))
        .route("/api/categories", get(budgets::list_categories))
        .route("/api/budgets", get(budgets::list_budgets).post(budgets::create_budget))
        .route(
            "/api/budgets/:id",
            get(budgets::get_budget)
                .patch(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route("/api/budgets/:id/visibility", post(budgets::toggle_visibility))
        .route("/api/public_budgets", get(budgets::public_budgets))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id", delete(admin::delete_user))
}
