use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::backend::response::{ok, success, ApiResult};
use crate::backend::session_store::Session;
use crate::backend::AppState;
use crate::services::BudgetDraft;

/// Raw budget form. Missing fields fall through to the validation messages.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BudgetForm {
    pub category: String,
    pub amount: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub public: bool,
}

impl BudgetForm {
    fn draft(&self) -> crate::error::ServiceResult<BudgetDraft> {
        BudgetDraft::from_form(
            &self.category,
            &self.amount,
            self.year,
            self.month,
            self.day,
            self.public,
        )
    }
}

pub async fn list_categories(State(state): State<AppState>, session: Session) -> ApiResult {
    state.gate.require_authenticated(&session.ctx)?;
    let categories = state.budgets.categories().await?;
    Ok(ok(json!({ "categories": categories })))
}

pub async fn list_budgets(State(state): State<AppState>, session: Session) -> ApiResult {
    let caller = state.gate.require_authenticated(&session.ctx)?;
    let budgets = state.budgets.list_for_owner(caller).await?;
    Ok(ok(json!({ "budgets": budgets })))
}

pub async fn create_budget(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<BudgetForm>,
) -> ApiResult {
    let caller = state.gate.require_authenticated(&session.ctx)?;
    let budget_id = state.budgets.create(caller, &form.draft()?).await?;
    Ok(success(StatusCode::CREATED, json!({ "budget_id": budget_id })))
}

pub async fn get_budget(
    State(state): State<AppState>,
    session: Session,
    Path(budget_id): Path<i64>,
) -> ApiResult {
    let caller = state.gate.require_authenticated(&session.ctx)?;
    let budget = state.budgets.get(budget_id, caller).await?;
    Ok(ok(json!({ "budget": budget })))
}

pub async fn update_budget(
    State(state): State<AppState>,
    session: Session,
    Path(budget_id): Path<i64>,
    Json(form): Json<BudgetForm>,
) -> ApiResult {
    let caller = state.gate.require_authenticated(&session.ctx)?;
    state.budgets.update(budget_id, caller, &form.draft()?).await?;
    Ok(ok(json!({})))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    session: Session,
    Path(budget_id): Path<i64>,
) -> ApiResult {
    let caller = state.gate.require_authenticated(&session.ctx)?;
    state.budgets.delete(budget_id, caller).await?;
    Ok(ok(json!({})))
}

pub async fn toggle_visibility(
    State(state): State<AppState>,
    session: Session,
    Path(budget_id): Path<i64>,
) -> ApiResult {
    let caller = state.gate.require_authenticated(&session.ctx)?;
    let is_public = state.budgets.toggle_visibility(budget_id, caller).await?;
    Ok(ok(json!({ "is_public": is_public })))
}

pub async fn public_budgets(State(state): State<AppState>, session: Session) -> ApiResult {
    state.gate.require_authenticated(&session.ctx)?;
    let budgets = state.budgets.list_all_public().await?;
    Ok(ok(json!({ "budgets": budgets })))
}
