// Session lifetime management
//
// `AuthSession` owns the credentials and the single current token. Logins
// are single-flight: callers that arrive while a login is running wait on
// the login mutex and share the outcome instead of issuing their own.
// Repeated credential rejections lock the session so a bad password cannot
// trip the vendor's account lockout.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{AuthError, TransportError};
use crate::transport::{ApiRequest, Transport};

const LOGIN_PATH: &str = "Login/Login";
const LOGOUT_PATH: &str = "Login/Logout";

/// Username and password for the Sector account.
///
/// `Debug` never prints either field.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Tunables for session handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    /// A token older than this is replaced before the next authorized call.
    pub session_ttl: Duration,
    /// Consecutive credential rejections before the session locks.
    pub lockout_threshold: u32,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(15 * 60),
            lockout_threshold: 2,
        }
    }
}

/// Non-secret view of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub issued_at: DateTime<Utc>,
    /// When the session will be replaced, from the TTL or a server hint.
    pub expires_at: DateTime<Utc>,
}

/// The token itself. Never leaves this crate.
pub(crate) struct Session {
    token: SecretString,
    issued: Instant,
    lifetime: Duration,
    info: SessionInfo,
}

impl Session {
    pub(crate) fn token(&self) -> &SecretString {
        &self.token
    }

    fn is_fresh(&self) -> bool {
        self.issued.elapsed() < self.lifetime
    }
}

struct LoginState {
    credentials: Credentials,
    consecutive_rejections: u32,
    /// Outcome of the most recent exchange, shared with callers that queued behind it.
    last_outcome: Option<Result<(), AuthError>>,
}

/// Owner of the credentials and the current session token.
pub struct AuthSession {
    transport: Arc<Transport>,
    policy: AuthPolicy,
    current: ArcSwapOption<Session>,
    /// Bumped after every completed exchange, success or not.
    generation: AtomicU64,
    locked: AtomicBool,
    login_count: AtomicU32,
    state: Mutex<LoginState>,
}

impl AuthSession {
    pub fn new(transport: Arc<Transport>, credentials: Credentials, policy: AuthPolicy) -> Self {
        Self {
            transport,
            policy,
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            locked: AtomicBool::new(false),
            login_count: AtomicU32::new(0),
            state: Mutex::new(LoginState {
                credentials,
                consecutive_rejections: 0,
                last_outcome: None,
            }),
        }
    }

    /// Log in with `credentials`, replacing the stored ones.
    ///
    /// Clears a Locked state. Always performs the credential exchange.
    pub async fn login(&self, credentials: Credentials) -> Result<SessionInfo, AuthError> {
        let mut state = self.state.lock().await;
        state.credentials = credentials;
        state.consecutive_rejections = 0;
        self.locked.store(false, Ordering::Release);
        let session = self.login_locked(&mut state).await?;
        Ok(session.info)
    }

    /// Swap in new credentials without logging in. Unlocks the session and
    /// drops the current token so the next call authenticates afresh.
    pub async fn replace_credentials(&self, credentials: Credentials) {
        let mut state = self.state.lock().await;
        state.credentials = credentials;
        state.consecutive_rejections = 0;
        state.last_outcome = None;
        self.locked.store(false, Ordering::Release);
        self.current.store(None);
        debug!("credentials replaced");
    }

    /// Make sure a fresh session exists, logging in if needed.
    ///
    /// No network I/O while the token is younger than the TTL, or while
    /// the session is Locked.
    pub async fn ensure_valid(&self) -> Result<(), AuthError> {
        self.session().await.map(drop)
    }

    /// Current fresh session, logging in (single-flight) when there is none.
    pub(crate) async fn session(&self) -> Result<Arc<Session>, AuthError> {
        if let Some(session) = self.fresh_session() {
            return Ok(session);
        }

        let observed = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        // Someone else finished an exchange while we queued: share a failure,
        // or pick up the session it produced.
        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(Err(e)) = &state.last_outcome {
                return Err(e.clone());
            }
        }
        if let Some(session) = self.fresh_session() {
            return Ok(session);
        }
        if self.locked.load(Ordering::Acquire) {
            debug!("session locked, skipping login");
            return Err(AuthError::Locked);
        }

        self.login_locked(&mut state).await
    }

    /// Drop the current token. The next authorized call logs in again.
    pub fn invalidate(&self) {
        self.current.store(None);
    }

    /// Drop `session` only if it is still the current one, so a token that
    /// another task just obtained survives a stale 401.
    pub(crate) fn invalidate_if_current(&self, session: &Arc<Session>) {
        self.current.rcu(|current| match current {
            Some(cur) if Arc::ptr_eq(cur, session) => None,
            other => other.clone(),
        });
    }

    /// Best-effort logout. The local token is dropped whatever the outcome.
    pub async fn logout(&self) -> Result<(), TransportError> {
        let Some(session) = self.current.swap(None) else {
            return Ok(());
        };
        let request = ApiRequest::post(LOGOUT_PATH, json!({}));
        self.transport
            .send(&request, Some(&session.token))
            .await
            .map(drop)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn has_valid_session(&self) -> bool {
        self.fresh_session().is_some()
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.fresh_session().map(|s| s.info)
    }

    /// Number of credential exchanges attempted so far.
    pub fn login_attempts(&self) -> u32 {
        self.login_count.load(Ordering::Relaxed)
    }

    fn fresh_session(&self) -> Option<Arc<Session>> {
        self.current.load_full().filter(|s| s.is_fresh())
    }

    async fn login_locked(&self, state: &mut LoginState) -> Result<Arc<Session>, AuthError> {
        self.login_count.fetch_add(1, Ordering::Relaxed);
        let outcome = self.exchange(&state.credentials).await.map(Arc::new);

        match &outcome {
            Ok(session) => {
                state.consecutive_rejections = 0;
                self.current.store(Some(Arc::clone(session)));
                info!("login successful");
            }
            Err(AuthError::InvalidCredentials) => {
                state.consecutive_rejections += 1;
                if state.consecutive_rejections >= self.policy.lockout_threshold {
                    self.locked.store(true, Ordering::Release);
                    warn!(
                        rejections = state.consecutive_rejections,
                        "credentials rejected repeatedly, locking session until new credentials are supplied"
                    );
                } else {
                    warn!(
                        rejections = state.consecutive_rejections,
                        "credentials rejected"
                    );
                }
            }
            Err(e) => warn!(error = %e, "login failed"),
        }

        state.last_outcome = Some(outcome.as_ref().map(drop).map_err(Clone::clone));
        self.generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        debug!("logging in");

        let body = json!({
            "userId": credentials.username,
            "password": credentials.password.expose_secret(),
        });
        let request = ApiRequest::post(LOGIN_PATH, body).idempotent();

        let response = match self.transport.send(&request, None).await {
            Ok(value) => value,
            Err(e) if e.is_credential_rejection() => {
                debug!(status = e.status(), "login refused");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::ServiceUnavailable(e)),
        };

        let token = response
            .get("AuthorizationToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidCredentials)?;

        // Optional server hint; the shorter of hint and TTL wins.
        let lifetime = response
            .get("ExpiresIn")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .map_or(self.policy.session_ttl, |hint| hint.min(self.policy.session_ttl));

        let issued_at = Utc::now();
        let expires_at = chrono::Duration::from_std(lifetime)
            .map_or(issued_at, |d| issued_at + d);

        Ok(Session {
            token: SecretString::from(token.to_owned()),
            issued: Instant::now(),
            lifetime,
            info: SessionInfo {
                issued_at,
                expires_at,
            },
        })
    }
}
