use axum::extract::{Path, State};
use serde_json::json;

use crate::backend::response::{ok, ApiResult};
use crate::backend::session_store::Session;
use crate::backend::AppState;

pub async fn list_users(State(state): State<AppState>, session: Session) -> ApiResult {
    state.gate.require_admin(&session.ctx)?;
    let users = state.admin.list_users().await?;
    Ok(ok(json!({ "users": users })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    Path(user_id): Path<i64>,
) -> ApiResult {
    let admin_id = state.gate.require_admin(&session.ctx)?;
    state.admin.delete_user(user_id, admin_id).await?;
    Ok(ok(json!({})))
}
