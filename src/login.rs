#![cfg(not(tarpaulin_include))]

//! Login gate in front of the search pages.
//!
//! One shared ID/password pair from the configuration unlocks the pages for a
//! browser session. This is a convenience gate for an internal tool and provides no
//! real access control: the credential is shared, compared in plain text, and there
//! is no lockout or rate limiting.

#[cfg(feature = "web")]
use crate::app::{ApiResponse, AppState};
use crate::error::{Result, SearchError};
use crate::views::ViewKind;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
#[cfg(feature = "web")]
use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
#[cfg(feature = "web")]
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "web")]
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Cookie carrying the server-side session ID.
pub const SESSION_COOKIE: &str = "session";
/// Cookie carrying the remember-me token.
pub const TOKEN_COOKIE: &str = "pvd_auth";

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// `create` sweeps expired sessions once per this many new sessions.
pub const PURGE_EVERY: usize = 64;

/// Login gate configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub username: String,
    pub password: String,
    /// Lifetime of the remember-me token.
    pub token_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            enabled: true,
            username: "admin".to_string(),
            password: String::new(),
            token_ttl_hours: 24,
        }
    }
}

/// Login form data.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    LoggedOut,
    LoggedIn,
}

/// Row most recently opened in a detail panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub view: ViewKind,
    pub key: String,
}

/// Everything one browser session remembers between requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub gate: GateState,
    pub selection: Option<Selection>,
}

impl SessionState {
    pub fn new(gate: GateState) -> Self {
        SessionState {
            gate,
            selection: None,
        }
    }

    /// Remember `key` as the open detail row, or forget the selection when the
    /// lookup found nothing.
    pub fn record_detail(&mut self, view: ViewKind, key: &str, found: bool) {
        self.selection = found.then(|| Selection {
            view,
            key: key.to_string(),
        });
    }

    /// Key of the selected row when it belongs to `view`.
    pub fn selected_key(&self, view: ViewKind) -> Option<&str> {
        self.selection
            .as_ref()
            .filter(|s| s.view == view)
            .map(|s| s.key.as_str())
    }
}

/// Checks submitted credentials against the single configured pair.
#[derive(Clone, Debug)]
pub struct AccessGate {
    enabled: bool,
    username: String,
    password: String,
    token_ttl: Duration,
}

impl AccessGate {
    pub fn new(config: &AuthConfig) -> Self {
        AccessGate {
            enabled: config.enabled,
            username: config.username.clone(),
            password: config.password.clone(),
            token_ttl: Duration::from_secs(config.token_ttl_hours.saturating_mul(3600)),
        }
    }

    /// A gate that lets every session through.
    pub fn disabled() -> Self {
        AccessGate::new(&AuthConfig {
            enabled: false,
            ..AuthConfig::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// True when the session may see the search pages.
    pub fn permits(&self, session: &SessionState) -> bool {
        !self.enabled || session.gate == GateState::LoggedIn
    }

    /// `LoggedOut -> LoggedIn` when the pair matches exactly, otherwise the session
    /// stays logged out and `InvalidCredential` is returned.
    pub fn submit(&self, session: &mut SessionState, credentials: &UserCredentials) -> Result<()> {
        if !self.enabled
            || (credentials.username == self.username && credentials.password == self.password)
        {
            session.gate = GateState::LoggedIn;
            Ok(())
        } else {
            session.gate = GateState::LoggedOut;
            Err(SearchError::InvalidCredential)
        }
    }

    /// `LoggedIn -> LoggedOut`; the detail selection goes with the auth flag.
    pub fn logout(&self, session: &mut SessionState) {
        session.gate = GateState::LoggedOut;
        session.selection = None;
    }

    /// Starting state for a new session, given the remember-me token it presented.
    pub fn initial_state(&self, token: Option<&str>) -> GateState {
        if !self.enabled || token.is_some_and(|t| self.verify_token(t)) {
            GateState::LoggedIn
        } else {
            GateState::LoggedOut
        }
    }

    pub fn issue_token(&self) -> Result<String> {
        self.issue_token_at(SystemTime::now())
    }

    /// Token of the form `<expiry unix seconds>.<argon2 hash>` where the hash covers
    /// the configured pair and the expiry.
    pub fn issue_token_at(&self, now: SystemTime) -> Result<String> {
        let expires = unix_secs(now + self.token_ttl);
        let hash = hash_password(&self.token_material(expires))?;
        Ok(format!("{}.{}", expires, hash))
    }

    pub fn verify_token(&self, token: &str) -> bool {
        self.verify_token_at(token, SystemTime::now())
    }

    /// A token is valid when it has not expired and its hash matches the current
    /// credential pair; changing the password invalidates every issued token.
    pub fn verify_token_at(&self, token: &str, now: SystemTime) -> bool {
        if !self.enabled {
            return false;
        }
        let Some((expires, hash)) = token.split_once('.') else {
            return false;
        };
        let Ok(expires) = expires.parse::<u64>() else {
            return false;
        };
        if expires <= unix_secs(now) {
            return false;
        }
        verify_password(&self.token_material(expires), hash).unwrap_or(false)
    }

    fn token_material(&self, expires: u64) -> String {
        format!("{}\u{1f}{}\u{1f}{}", self.username, self.password, expires)
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SearchError::Io(std::io::Error::other(format!("hashing failed: {}", e))))
}

/// Verify a password against a stored hash
fn verify_password(password: &str, hash: &str) -> std::result::Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Server-side session entry
#[derive(Debug, Clone)]
struct Session {
    state: SessionState,
    expires_at: SystemTime,
}

/// Per-session state keyed by session ID.
///
/// Every session has its own gate flag and selection; nothing here is shared
/// between browsers.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    created: AtomicUsize,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_ttl(Duration::from_secs(SESSION_DURATION))
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            created: AtomicUsize::new(0),
        }
    }

    /// Store `state` under a fresh random ID.
    ///
    /// Every [`PURGE_EVERY`]th call first drops the expired sessions.
    pub fn create(&self, state: SessionState) -> String {
        if self.created.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            self.purge_expired();
        }
        let session_id = Uuid::new_v4().to_string();
        self.put(&session_id, state);
        session_id
    }

    /// Insert or replace a session and restart its expiry clock.
    pub fn put(&self, session_id: &str, state: SessionState) {
        let session = Session {
            state,
            expires_at: SystemTime::now() + self.ttl,
        };
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session_id.to_string(), session);
    }

    /// State of a live session; expired sessions read as absent.
    pub fn get(&self, session_id: &str) -> Option<SessionState> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session_id)
            .filter(|s| s.expires_at > SystemTime::now())
            .map(|s| s.state.clone())
    }

    /// Apply `f` to a live session.
    pub fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get_mut(session_id)
            .filter(|s| s.expires_at > SystemTime::now())
            .map(|s| f(&mut s.state))
    }

    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id);
    }

    /// Drop expired sessions and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session ID attached to requests that passed [`require_auth`].
#[cfg(feature = "web")]
#[derive(Clone, Debug)]
pub struct SessionId(pub String);

#[cfg(feature = "web")]
fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(feature = "web")]
fn token_cookie(token: &str, ttl: Duration) -> Cookie<'static> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((TOKEN_COOKIE, urlencoding::encode(token).into_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

#[cfg(feature = "web")]
fn presented_token(jar: &CookieJar) -> Option<String> {
    jar.get(TOKEN_COOKIE)
        .and_then(|c| urlencoding::decode(c.value()).ok())
        .map(|t| t.into_owned())
}

/// Live session ID from the cookie jar, if any.
#[cfg(feature = "web")]
fn live_session(state: &AppState, jar: &CookieJar) -> Option<(String, SessionState)> {
    let session_id = jar.get(SESSION_COOKIE)?.value().to_string();
    let session = state.sessions.get(&session_id)?;
    Some((session_id, session))
}

/// Serve the login page HTML
#[cfg(feature = "web")]
pub async fn serve_login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    match live_session(&state, &jar) {
        Some((_, session)) if state.gate.permits(&session) => Redirect::to("/search").into_response(),
        _ => Html(include_str!("./static/login.html")).into_response(),
    }
}

/// Handle login form submissions
///
/// On success the session is marked logged in, a remember-me token cookie is set
/// and the browser goes to the search page. On failure it returns to the login
/// page with an error message.
#[cfg(feature = "web")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    let existing = live_session(&state, &jar);
    let mut session = existing
        .as_ref()
        .map(|(_, s)| s.clone())
        .unwrap_or_default();

    match state.gate.submit(&mut session, &credentials) {
        Ok(()) => {
            info!("login accepted for '{}'", credentials.username);
            let session_id = match existing {
                Some((session_id, _)) => {
                    state.sessions.put(&session_id, session);
                    session_id
                }
                None => state.sessions.create(session),
            };

            let mut jar = jar.add(session_cookie(session_id));
            if state.gate.is_enabled() {
                match state.gate.issue_token() {
                    Ok(token) => jar = jar.add(token_cookie(&token, state.gate.token_ttl())),
                    Err(e) => warn!("could not issue login token: {}", e),
                }
            }
            (jar, Redirect::to("/search")).into_response()
        }
        Err(SearchError::InvalidCredential) => {
            warn!("login rejected for '{}'", credentials.username);
            Redirect::to("/login?error=invalid").into_response()
        }
        Err(e) => {
            error!("login failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
        }
    }
}

/// Handle logout
///
/// Flips the session back to logged out, forgets its detail selection and removes
/// the remember-me token.
#[cfg(feature = "web")]
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state
            .sessions
            .update(cookie.value(), |session| state.gate.logout(session));
    }

    let removal = Cookie::build(TOKEN_COOKIE).path("/");
    (jar.remove(removal), Redirect::to("/login"))
}

/// Authentication middleware
///
/// Requests from sessions the gate permits continue with a [`SessionId`]
/// extension. A request without a live session gets a new one only when it would
/// be let through (gate off, or a valid token cookie); everything else gets 401 on
/// `/api/` paths and a redirect to the login page elsewhere, and nothing is stored.
#[cfg(feature = "web")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let (session_id, jar) = match live_session(&state, &jar) {
        Some((session_id, session)) if state.gate.permits(&session) => (session_id, jar),
        Some(_) => return reject(request.uri().path(), jar),
        None => {
            let token = presented_token(&jar);
            let session = SessionState::new(state.gate.initial_state(token.as_deref()));
            if !state.gate.permits(&session) {
                return reject(request.uri().path(), jar);
            }
            let session_id = state.sessions.create(session);
            let jar = jar.add(session_cookie(session_id.clone()));
            (session_id, jar)
        }
    };

    request.extensions_mut().insert(SessionId(session_id));
    (jar, next.run(request).await).into_response()
}

#[cfg(feature = "web")]
fn reject(path: &str, jar: CookieJar) -> Response {
    if path.starts_with("/api/") {
        (
            StatusCode::UNAUTHORIZED,
            jar,
            Json(ApiResponse::error("login required")),
        )
            .into_response()
    } else {
        (jar, Redirect::to("/login")).into_response()
    }
}
