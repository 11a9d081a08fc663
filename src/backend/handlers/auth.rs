use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::backend::response::{ok, success, ApiError, ApiResult};
use crate::backend::session_store::Session;
use crate::backend::AppState;
use crate::messages;
use crate::error::ServiceResult;
use crate::services::{LoginOutcome, SessionContext};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetupAdminForm {
    pub username: String,
    pub password: String,
    pub admin_key: String,
}

pub async fn register(
    State(state): State<AppState>,
    mut session: Session,
    Json(form): Json<RegisterForm>,
) -> Response {
    let result = register_user(&state, &mut session.ctx, &form).await;
    state.sessions.commit(session, result.into_response())
}

async fn register_user(
    state: &AppState,
    session: &mut SessionContext,
    form: &RegisterForm,
) -> ApiResult {
    if form.password != form.confirm_password {
        return Err(ApiError::BadRequest(messages::PASSWORDS_DIFFER));
    }

    let user_id = state.gate.credentials().register(&form.username, &form.password).await?;
    state.gate.establish(session, user_id, &form.username);

    Ok(success(
        StatusCode::CREATED,
        json!({ "user_id": user_id, "username": form.username }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Json(form): Json<LoginForm>,
) -> Response {
    let result = state
        .gate
        .login(&mut session.ctx, &form.username, &form.password, Utc::now())
        .await;

    state.sessions.commit(session, login_response(result).into_response())
}

pub async fn admin_login(
    State(state): State<AppState>,
    mut session: Session,
    Json(form): Json<LoginForm>,
) -> Response {
    let result = state
        .gate
        .admin_login(&mut session.ctx, &form.username, &form.password, Utc::now())
        .await;

    state.sessions.commit(session, login_response(result).into_response())
}

fn login_response(result: ServiceResult<LoginOutcome>) -> ApiResult {
    match result? {
        LoginOutcome::LoggedIn { user_id, username } => {
            Ok(ok(json!({ "user_id": user_id, "username": username })))
        }
        LoginOutcome::InvalidCredentials(message) => Err(ApiError::InvalidCredentials(message)),
        LoginOutcome::LockedOut(message) => Err(ApiError::LockedOut(message)),
    }
}

pub async fn logout(State(state): State<AppState>, mut session: Session) -> Response {
    state.gate.logout(&mut session.ctx);
    state.sessions.destroy(session, ok(json!({})))
}

pub async fn current_session(session: Session) -> Response {
    ok(json!({
        "authenticated": session.ctx.is_authenticated(),
        "user_id": session.ctx.user_id,
        "username": session.ctx.username,
        "is_admin": session.ctx.is_admin,
    }))
}

/// One-time admin bootstrap, gated by the configured setup key.
pub async fn setup_admin(
    State(state): State<AppState>,
    Json(form): Json<SetupAdminForm>,
) -> ApiResult {
    let Some(expected) = state.config.admin_setup_key.as_deref() else {
        return Err(ApiError::SetupRejected(messages::ADMIN_SETUP_DISABLED));
    };

    if !bool::from(form.admin_key.as_bytes().ct_eq(expected.as_bytes())) {
        warn!("Admin setup attempted with an invalid key");
        return Err(ApiError::SetupRejected(messages::INVALID_SETUP_KEY));
    }

    let user_id = state
        .gate
        .credentials()
        .register_admin(&form.username, &form.password)
        .await?;

    info!(user_id, "Admin account created through setup");
    Ok(success(StatusCode::CREATED, json!({ "user_id": user_id })))
}
