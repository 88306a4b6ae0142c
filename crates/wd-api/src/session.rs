//! # Session Middleware
//!
//! Cookie sessions via tower-sessions. The session only stores the buyer id;
//! the user record is looked up on every request.

use crate::state::AppState;
use tower_sessions::{
    cookie::{time::Duration, SameSite},
    Expiry, MemoryStore, Session, SessionManagerLayer,
};
use wd_core::{StorefrontError, StorefrontResult, User};

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Session expiry time in seconds (7 days)
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

const USER_ID_KEY: &str = "user_id";

/// Create the session layer with an in-memory store
pub fn create_session_layer(secure: bool) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(SESSION_EXPIRY_SECONDS)))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Bind the session to a user, issuing a fresh session id
pub async fn set_current_user(session: &Session, user: &User) -> StorefrontResult<()> {
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(USER_ID_KEY, user.id)
        .await
        .map_err(session_error)
}

/// Discard the session entirely (logout)
pub async fn clear_current_user(session: &Session) -> StorefrontResult<()> {
    session.flush().await.map_err(session_error)
}

/// The session's user, or `NotAuthenticated`
pub async fn require_user(state: &AppState, session: &Session) -> StorefrontResult<User> {
    let user_id = session
        .get::<u64>(USER_ID_KEY)
        .await
        .map_err(session_error)?
        .ok_or(StorefrontError::NotAuthenticated)?;

    state
        .users
        .get(user_id)
        .await
        .ok_or(StorefrontError::NotAuthenticated)
}

fn session_error(e: tower_sessions::session::Error) -> StorefrontError {
    StorefrontError::Internal(format!("Session store error: {}", e))
}
