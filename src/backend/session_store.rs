//! Server-side session records keyed by a signed cookie.
//!
//! The cookie is `<uuid>.<hex HMAC-SHA256(uuid)>`. Anything that fails to
//! parse or verify is treated as no cookie at all.
//!
//! Each record sits behind its own async mutex. A request holds that lock from
//! extraction until it commits, destroys or drops its [`Session`], so requests
//! carrying the same cookie are served one at a time and never overwrite each
//! other's throttle bookkeeping.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::services::SessionContext;

use super::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "budget_session";

#[derive(Debug)]
struct SessionRecord {
    ctx: SessionContext,
    last_seen: DateTime<Utc>,
    /// Cleared when the record is destroyed or evicted, for requests that
    /// were already waiting on its lock.
    live: bool,
}

type Slot = Arc<Mutex<SessionRecord>>;

/// One caller's session for the duration of a request.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    pub ctx: SessionContext,
    record: Option<OwnedMutexGuard<SessionRecord>>,
}

impl Session {
    fn anonymous() -> Self {
        Self {
            id: Uuid::new_v4(),
            ctx: SessionContext::default(),
            record: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// No stored record backs this session yet.
    pub fn is_fresh(&self) -> bool {
        self.record.is_none()
    }
}

pub struct SessionStore {
    mac: HmacSha256,
    sessions: DashMap<Uuid, Slot>,
    idle_timeout: Duration,
}

impl SessionStore {
    /// `idle_timeout` is how long a record survives without a request.
    pub fn new(secret: &str, idle_timeout: Duration) -> Result<Self, ConfigError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                name: "SESSION_SECRET",
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            mac,
            sessions: DashMap::new(),
            idle_timeout,
        })
    }

    /// The session named by the request's cookie, or a new anonymous one.
    /// Waits while another request holds the same session.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        if let Some(id) = self.session_id(headers) {
            let slot = self.sessions.get(&id).map(|entry| Arc::clone(entry.value()));
            if let Some(slot) = slot {
                let mut record = slot.lock_owned().await;
                if record.live {
                    record.last_seen = Utc::now();
                    return Session {
                        id,
                        ctx: record.ctx.clone(),
                        record: Some(record),
                    };
                }
                debug!(%id, "Session ended while the request waited for it");
            }
        }

        Session::anonymous()
    }

    /// Writes the session back and releases it. A caller without a stored
    /// record gets one, and a cookie, unless its session is still untouched.
    pub fn commit(&self, session: Session, mut response: Response) -> Response {
        let Session { id, ctx, record } = session;

        if let Some(mut record) = record {
            record.ctx = ctx;
            record.last_seen = Utc::now();
            return response;
        }

        if ctx == SessionContext::default() {
            return response;
        }

        let record = SessionRecord {
            ctx,
            last_seen: Utc::now(),
            live: true,
        };
        self.sessions.insert(id, Arc::new(Mutex::new(record)));

        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.token(&id)
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
        response
    }

    /// Forgets the session and expires the cookie.
    pub fn destroy(&self, session: Session, mut response: Response) -> Response {
        let Some(mut record) = session.record else {
            return response;
        };

        record.live = false;
        self.sessions.remove(&session.id);

        let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
        response
    }

    /// Drops every record idle for longer than the timeout and returns how
    /// many went. Records locked by a request in flight are kept.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.sessions.retain(|_, slot| match slot.try_lock() {
            Ok(mut record) if now - record.last_seen > self.idle_timeout => {
                record.live = false;
                evicted += 1;
                false
            }
            _ => true,
        });
        evicted
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn token(&self, id: &Uuid) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
    }

    fn session_id(&self, headers: &HeaderMap) -> Option<Uuid> {
        let token = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, token)| token)?;

        self.verify(token)
    }

    fn verify(&self, token: &str) -> Option<Uuid> {
        let (id, signature) = token.split_once('.')?;
        let id = Uuid::parse_str(id).ok()?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id)
    }
}

/// Runs [`SessionStore::evict_idle`] on a fixed interval for the life of the process.
pub fn spawn_eviction(store: Arc<SessionStore>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);

        loop {
            ticker.tick().await;

            let evicted = store.evict_idle(Utc::now());
            if evicted > 0 {
                debug!(evicted, "Evicted idle sessions");
            }
        }
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.sessions.load(&parts.headers).await)
    }
}
