mod handlers;
mod routes;
pub mod response;
pub mod session_store;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::ConfigError;
use crate::services::{AdminService, BudgetService, CredentialStore, SessionGate};

use session_store::SessionStore;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub gate: SessionGate,
    pub budgets: BudgetService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(pool: Pool<Sqlite>, config: Config) -> Result<Self, ConfigError> {
        let credentials = CredentialStore::new(pool.clone(), config.bcrypt_cost);
        let gate = SessionGate::new(credentials);
        // Idle records must outlive any lockout they carry.
        let idle_secs = config.session_idle_secs.max(gate.longest_cooldown_secs());
        let sessions =
            SessionStore::new(&config.session_secret, chrono::Duration::seconds(idle_secs))?;

        Ok(Self {
            sessions: Arc::new(sessions),
            gate,
            budgets: BudgetService::new(pool.clone()),
            admin: AdminService::new(pool),
            config: Arc::new(config),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(pool: Pool<Sqlite>, config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let state = AppState::new(pool, config)?;
    session_store::spawn_eviction(Arc::clone(&state.sessions), SESSION_SWEEP_INTERVAL);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
