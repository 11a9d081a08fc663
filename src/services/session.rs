//! The request-scoped trust boundary: who is calling, are they an admin, and
//! have they failed to log in too often lately.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ServiceResult;
use crate::messages;

use super::credentials::CredentialStore;

/// How many failures are tolerated before a cooldown kicks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub max_attempts: u32,
    pub cooldown_secs: i64,
}

impl ThrottlePolicy {
    pub const USER: Self = Self {
        max_attempts: 5,
        cooldown_secs: 30,
    };

    pub const ADMIN: Self = Self {
        max_attempts: 5,
        cooldown_secs: 300,
    };
}

/// Failed-attempt counter for one login path of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginThrottle {
    pub failures: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl LoginThrottle {
    /// The window is measured from the most recent failure.
    pub fn is_locked(&self, policy: &ThrottlePolicy, now: DateTime<Utc>) -> bool {
        self.failures >= policy.max_attempts
            && self
                .last_attempt
                .map_or(false, |last| now - last < Duration::seconds(policy.cooldown_secs))
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failures += 1;
        self.last_attempt = Some(now);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    AuthenticatedAdmin,
}

/// Everything the server remembers about one caller between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub is_admin: bool,
    pub login_throttle: LoginThrottle,
    pub admin_throttle: LoginThrottle,
}

impl SessionContext {
    pub fn state(&self) -> SessionState {
        match (self.user_id, self.is_admin) {
            (None, _) => SessionState::Anonymous,
            (Some(_), false) => SessionState::Authenticated,
            (Some(_), true) => SessionState::AuthenticatedAdmin,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Drops identity, admin flag and both throttles.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn { user_id: i64, username: String },
    InvalidCredentials(&'static str),
    /// Rejected without looking at the credentials at all.
    LockedOut(&'static str),
}

impl LoginOutcome {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::LoggedIn { .. } => None,
            Self::InvalidCredentials(message) | Self::LockedOut(message) => Some(*message),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("{}", messages::NOT_LOGGED_IN)]
    NotAuthenticated,

    #[error("{}", messages::ADMIN_REQUIRED)]
    NotAdmin,
}

#[derive(Clone)]
pub struct SessionGate {
    credentials: CredentialStore,
    user_policy: ThrottlePolicy,
    admin_policy: ThrottlePolicy,
}

impl SessionGate {
    pub fn new(credentials: CredentialStore) -> Self {
        Self::with_policies(credentials, ThrottlePolicy::USER, ThrottlePolicy::ADMIN)
    }

    pub fn with_policies(
        credentials: CredentialStore,
        user_policy: ThrottlePolicy,
        admin_policy: ThrottlePolicy,
    ) -> Self {
        Self {
            credentials,
            user_policy,
            admin_policy,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// A session record kept at least this long after its last failed
    /// attempt still remembers any lockout.
    pub fn longest_cooldown_secs(&self) -> i64 {
        self.user_policy.cooldown_secs.max(self.admin_policy.cooldown_secs)
    }

    /// Anonymous -> Authenticated. A regular login never grants admin, so a
    /// session that switches account through this path loses the flag.
    pub async fn login(
        &self,
        session: &mut SessionContext,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<LoginOutcome> {
        if session.login_throttle.is_locked(&self.user_policy, now) {
            warn!(
                username,
                failures = session.login_throttle.failures,
                "Login attempt during lockout"
            );
            return Ok(LoginOutcome::LockedOut(messages::LOGIN_LOCKED_OUT));
        }

        match self.credentials.verify(username, password).await? {
            Some(user) => {
                session.user_id = Some(user.id);
                session.username = Some(user.username.clone());
                session.is_admin = false;
                session.login_throttle.reset();
                info!(user_id = user.id, "User logged in");
                Ok(LoginOutcome::LoggedIn {
                    user_id: user.id,
                    username: user.username,
                })
            }
            None => {
                session.login_throttle.record_failure(now);
                Ok(LoginOutcome::InvalidCredentials(messages::INVALID_CREDENTIALS))
            }
        }
    }

    /// Any state -> AuthenticatedAdmin, setting identity and flag in one step.
    pub async fn admin_login(
        &self,
        session: &mut SessionContext,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<LoginOutcome> {
        if session.admin_throttle.is_locked(&self.admin_policy, now) {
            warn!(
                username,
                failures = session.admin_throttle.failures,
                "Admin login attempt during lockout"
            );
            return Ok(LoginOutcome::LockedOut(messages::ADMIN_LOGIN_LOCKED_OUT));
        }

        match self.credentials.verify_admin(username, password).await? {
            Some(user) => {
                session.user_id = Some(user.id);
                session.username = Some(user.username.clone());
                session.is_admin = true;
                session.admin_throttle.reset();
                info!(user_id = user.id, "Admin logged in");
                Ok(LoginOutcome::LoggedIn {
                    user_id: user.id,
                    username: user.username,
                })
            }
            None => {
                session.admin_throttle.record_failure(now);
                Ok(LoginOutcome::InvalidCredentials(messages::INVALID_ADMIN_CREDENTIALS))
            }
        }
    }

    /// Signs in a freshly registered user without a second password check.
    pub fn establish(&self, session: &mut SessionContext, user_id: i64, username: &str) {
        session.user_id = Some(user_id);
        session.username = Some(username.to_string());
        session.is_admin = false;
        session.login_throttle.reset();
    }

    pub fn logout(&self, session: &mut SessionContext) {
        if let Some(user_id) = session.user_id {
            info!(user_id, "User logged out");
        }
        session.clear();
    }

    pub fn require_authenticated(&self, session: &SessionContext) -> Result<i64, AccessDenied> {
        session.user_id.ok_or(AccessDenied::NotAuthenticated)
    }

    pub fn require_admin(&self, session: &SessionContext) -> Result<i64, AccessDenied> {
        let user_id = self.require_authenticated(session)?;
        if session.is_admin {
            Ok(user_id)
        } else {
            Err(AccessDenied::NotAdmin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{connection, migrate};
    use crate::error::ServiceError;

    async fn gate() -> (SessionGate, sqlx::Pool<sqlx::Sqlite>) {
        let pool = connection::memory_pool().await.unwrap();
        migrate::prepare(&pool).await.unwrap();
        let store = CredentialStore::new(pool.clone(), 4);
        store.register("alice", "Secret1").await.unwrap();
        store.register_admin("root", "Admin123").await.unwrap();
        (SessionGate::new(store), pool)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_740_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn throttle_locks_after_max_failures_within_window() {
        let policy = ThrottlePolicy::USER;
        let mut throttle = LoginThrottle::default();

        for i in 0..4 {
            throttle.record_failure(at(i));
            assert!(!throttle.is_locked(&policy, at(i)));
        }
        throttle.record_failure(at(4));
        assert!(throttle.is_locked(&policy, at(4)));
        assert!(throttle.is_locked(&policy, at(33)));
        assert!(!throttle.is_locked(&policy, at(34)));
    }

    #[tokio::test]
    async fn longest_cooldown_covers_both_paths() {
        let (gate, pool) = gate().await;
        assert_eq!(gate.longest_cooldown_secs(), 300);

        let store = CredentialStore::new(pool, 4);
        let slow_users = ThrottlePolicy {
            max_attempts: 3,
            cooldown_secs: 900,
        };
        let gate = SessionGate::with_policies(store, slow_users, ThrottlePolicy::ADMIN);
        assert_eq!(gate.longest_cooldown_secs(), 900);
    }

    #[test]
    fn admin_window_is_longer() {
        let mut throttle = LoginThrottle::default();
        for _ in 0..5 {
            throttle.record_failure(at(0));
        }
        assert!(!throttle.is_locked(&ThrottlePolicy::USER, at(60)));
        assert!(throttle.is_locked(&ThrottlePolicy::ADMIN, at(60)));
        assert!(!throttle.is_locked(&ThrottlePolicy::ADMIN, at(300)));
    }

    #[tokio::test]
    async fn successful_login_sets_identity_and_resets_counter() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();

        let outcome = gate.login(&mut session, "alice", "wrong", at(0)).await.unwrap();
        assert_eq!(outcome, LoginOutcome::InvalidCredentials(messages::INVALID_CREDENTIALS));
        assert_eq!(session.login_throttle.failures, 1);

        let outcome = gate.login(&mut session, "alice", "Secret1", at(1)).await.unwrap();
        assert!(matches!(
            outcome,
            LoginOutcome::LoggedIn { ref username, .. } if username == "alice"
        ));
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.login_throttle, LoginThrottle::default());
    }

    #[tokio::test]
    async fn sixth_attempt_is_locked_out_even_with_correct_password() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();

        for i in 0..5 {
            let outcome = gate.login(&mut session, "alice", "wrong", at(i)).await.unwrap();
            assert!(matches!(outcome, LoginOutcome::InvalidCredentials(_)));
        }

        let outcome = gate.login(&mut session, "alice", "Secret1", at(10)).await.unwrap();
        assert_eq!(outcome, LoginOutcome::LockedOut(messages::LOGIN_LOCKED_OUT));
        assert_ne!(outcome.message(), Some(messages::INVALID_CREDENTIALS));
        assert_eq!(session.state(), SessionState::Anonymous);

        // Once the window has passed the correct password works again.
        let outcome = gate.login(&mut session, "alice", "Secret1", at(40)).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LoggedIn { .. }));
    }

    #[tokio::test]
    async fn lockout_does_not_touch_the_credential_store() {
        let (gate, pool) = gate().await;
        let mut session = SessionContext::default();
        for i in 0..5 {
            gate.login(&mut session, "alice", "wrong", at(i)).await.unwrap();
        }

        pool.close().await;

        let outcome = gate.login(&mut session, "alice", "Secret1", at(5)).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LockedOut(_)));

        // Outside the lockout the closed pool is reached and reported.
        let mut fresh = SessionContext::default();
        let err = gate.login(&mut fresh, "alice", "Secret1", at(5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn admin_login_sets_both_identity_and_flag() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();

        let outcome = gate.admin_login(&mut session, "alice", "Secret1", at(0)).await.unwrap();
        assert_eq!(outcome, LoginOutcome::InvalidCredentials(messages::INVALID_ADMIN_CREDENTIALS));
        assert_eq!(session.admin_throttle.failures, 1);
        assert_eq!(session.login_throttle.failures, 0);

        let outcome = gate.admin_login(&mut session, "root", "Admin123", at(1)).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LoggedIn { .. }));
        assert_eq!(session.state(), SessionState::AuthenticatedAdmin);
        assert!(gate.require_admin(&session).is_ok());
    }

    #[tokio::test]
    async fn admin_lockout_uses_its_own_counter_and_message() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();
        for i in 0..5 {
            gate.admin_login(&mut session, "root", "nope", at(i)).await.unwrap();
        }

        let outcome = gate.admin_login(&mut session, "root", "Admin123", at(100)).await.unwrap();
        assert_eq!(outcome, LoginOutcome::LockedOut(messages::ADMIN_LOGIN_LOCKED_OUT));

        // The regular path is unaffected.
        let outcome = gate.login(&mut session, "alice", "Secret1", at(100)).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LoggedIn { .. }));
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();
        gate.admin_login(&mut session, "root", "Admin123", at(0)).await.unwrap();
        session.login_throttle.record_failure(at(1));

        gate.logout(&mut session);

        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_admin);
        assert_eq!(session.login_throttle, LoginThrottle::default());
    }

    #[tokio::test]
    async fn guards() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();
        assert_eq!(gate.require_authenticated(&session), Err(AccessDenied::NotAuthenticated));
        assert_eq!(gate.require_admin(&session), Err(AccessDenied::NotAuthenticated));

        gate.login(&mut session, "alice", "Secret1", at(0)).await.unwrap();
        let user_id = gate.require_authenticated(&session).unwrap();
        assert_eq!(session.user_id, Some(user_id));
        assert_eq!(gate.require_admin(&session), Err(AccessDenied::NotAdmin));
    }

    #[tokio::test]
    async fn regular_login_drops_admin_flag() {
        let (gate, _pool) = gate().await;
        let mut session = SessionContext::default();
        gate.admin_login(&mut session, "root", "Admin123", at(0)).await.unwrap();

        gate.login(&mut session, "alice", "Secret1", at(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
    }
}
