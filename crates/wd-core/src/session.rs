//! # Auth Session
//!
//! Client-side authentication state.
//!
//! ```text
//!             probe ok            login / register ok
//!  Loading ──────────────► Authenticated ◄───────────── Unauthenticated
//!     │                         │                              ▲
//!     │ probe: no session       │ logout (always)              │
//!     └─────────────────────────┴──────────────────────────────┘
//! ```
//!
//! The session starts in `Loading`. Protected views are held back until the
//! one-time probe settles. Logout is always locally effective.

use crate::error::{StorefrontError, StorefrontResult};
use crate::gateway::BoxedAuthBackend;
use crate::user::{LoginRequest, RegistrationForm, User};
use tracing::{debug, info, instrument, warn};

/// Where the session currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Startup probe still in flight
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(User),
}

/// What a protected view should do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess<'a> {
    /// Session unresolved; render nothing yet
    Pending,
    Allowed(&'a User),
    RedirectToLogin,
}

/// Owns the auth state; the only writer is its own action methods
pub struct AuthSession {
    backend: BoxedAuthBackend,
    state: AuthState,
    probed: bool,
}

impl AuthSession {
    /// New session in the `Loading` state
    pub fn new(backend: BoxedAuthBackend) -> Self {
        Self {
            backend,
            state: AuthState::Loading,
            probed: false,
        }
    }

    /// Resolve the existing session once. Later calls return the current state
    /// without contacting the backend.
    #[instrument(skip(self))]
    pub async fn probe(&mut self) -> &AuthState {
        if self.probed {
            return &self.state;
        }
        self.probed = true;

        let resolved = match self.backend.current_user().await {
            Ok(Some(user)) => {
                debug!("Session resolved for user {}", user.id);
                AuthState::Authenticated(user)
            }
            Ok(None) => AuthState::Unauthenticated,
            Err(e) => {
                warn!("Session check failed: {}", e);
                AuthState::Unauthenticated
            }
        };

        self.state = resolved;
        &self.state
    }

    #[instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: &str) -> StorefrontResult<&User> {
        let user = self
            .backend
            .login(&LoginRequest::new(email, password))
            .await?;
        info!("Logged in as {}", user.email);
        self.authenticate(user)
    }

    /// Validate the form locally, then register. Validation failures never
    /// reach the backend.
    #[instrument(skip(self, form), fields(email = %form.request.email))]
    pub async fn register(&mut self, form: RegistrationForm) -> StorefrontResult<&User> {
        let request = form.into_request()?;
        let user = self.backend.register(&request).await?;
        info!("Registered {} ({})", user.email, user.company_name);
        self.authenticate(user)
    }

    /// Drop the user locally regardless of what the backend says
    #[instrument(skip(self))]
    pub async fn logout(&mut self) {
        if let Err(e) = self.backend.logout().await {
            warn!("Logout failed: {}", e);
        }
        self.probed = true;
        self.state = AuthState::Unauthenticated;
    }

    fn authenticate(&mut self, user: User) -> StorefrontResult<&User> {
        self.probed = true;
        self.state = AuthState::Authenticated(user);
        self.user()
            .ok_or_else(|| StorefrontError::Internal("session lost its user".to_string()))
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Loading)
    }

    /// Gate for protected views
    pub fn access(&self) -> RouteAccess<'_> {
        match &self.state {
            AuthState::Loading => RouteAccess::Pending,
            AuthState::Authenticated(user) => RouteAccess::Allowed(user),
            AuthState::Unauthenticated => RouteAccess::RedirectToLogin,
        }
    }
}
