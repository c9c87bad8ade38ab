//! Session lifecycle against the upstream engine.
//!
//! [`SessionLifecycle`] owns establishing, refreshing and tearing down one
//! authenticated session. All wire access goes through the
//! [`EngineTransport`] seam, so the lifecycle itself never touches HTTP
//! directly. Session state lives in an explicit [`EngineSession`] value
//! threaded through every call rather than in a hidden cookie jar.

use crate::engine::transport::EngineTransport;
use crate::engine::types::EngineError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A principal's credential pair for the upstream engine.
///
/// Never serialized; retained inside the owning session only so an expired
/// session can be re-established without asking the caller again.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated state for one principal against the engine.
///
/// Created unauthenticated, populated by a successful login, refreshed in
/// place on re-login and cleared by [`SessionLifecycle::terminate`].
#[derive(Debug, Clone)]
pub struct EngineSession {
    credentials: Credentials,
    session_token: Option<String>,
    api_token: Option<String>,
    authenticated: bool,
    established_at: Option<DateTime<Utc>>,
}

impl EngineSession {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            session_token: None,
            api_token: None,
            authenticated: false,
            established_at: None,
        }
    }

    /// The identity this session acts on behalf of.
    pub fn principal(&self) -> &str {
        &self.credentials.username
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn established_at(&self) -> Option<DateTime<Utc>> {
        self.established_at
    }

    /// Purely local liveness check: authenticated and holding a session
    /// token. Performs no network call; actual expiry is only discovered
    /// when the engine answers 401.
    pub fn is_active(&self) -> bool {
        self.authenticated && self.session_token.is_some()
    }

    pub(crate) fn apply_login(&mut self, session_token: String, api_token: Option<String>) {
        self.session_token = Some(session_token);
        self.api_token = api_token;
        self.authenticated = true;
        self.established_at = Some(Utc::now());
    }

    pub(crate) fn clear(&mut self) {
        self.session_token = None;
        self.api_token = None;
        self.authenticated = false;
        self.established_at = None;
    }
}

/// Establishes, refreshes and terminates engine sessions.
#[derive(Clone)]
pub struct SessionLifecycle {
    transport: Arc<dyn EngineTransport>,
}

impl SessionLifecycle {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self { transport }
    }

    /// Logs in with the given credentials and returns an authenticated
    /// session. A rejected login and an unreachable login endpoint both
    /// surface as [`EngineError::Authentication`]; the message keeps the
    /// distinction.
    pub async fn establish(&self, credentials: Credentials) -> Result<EngineSession, EngineError> {
        let mut session = EngineSession::new(credentials);
        self.refresh(&mut session).await?;
        Ok(session)
    }

    /// Re-authenticates the session in place using its retained credentials.
    pub async fn refresh(&self, session: &mut EngineSession) -> Result<(), EngineError> {
        let outcome = self
            .transport
            .login(session.credentials())
            .await
            .map_err(|err| {
                EngineError::Authentication(format!("engine login endpoint unreachable: {err}"))
            })?;

        if !(200..300).contains(&outcome.status) {
            return Err(EngineError::Authentication(format!(
                "engine rejected login for '{}' (HTTP {})",
                session.principal(),
                outcome.status
            )));
        }

        let Some(session_token) = outcome.session_token else {
            return Err(EngineError::Authentication(format!(
                "login for '{}' succeeded but no session cookie was returned",
                session.principal()
            )));
        };

        if outcome.api_token.is_none() {
            // Degraded mode: the session is usable, but the engine may
            // reject state-changing calls without the anti-forgery token.
            warn!(
                principal = %session.principal(),
                "login succeeded without an anti-forgery token; write operations may fail upstream"
            );
        }

        session.apply_login(session_token, outcome.api_token);
        info!(principal = %session.principal(), "engine session established");
        Ok(())
    }

    /// Best-effort logout. Upstream failures are logged and swallowed;
    /// local state is always cleared.
    pub async fn terminate(&self, session: &mut EngineSession) {
        if session.is_active() {
            match self.transport.logout(session).await {
                Ok(status) if (200..300).contains(&status) => {
                    info!(principal = %session.principal(), "engine session closed");
                }
                Ok(status) => {
                    warn!(
                        principal = %session.principal(),
                        status,
                        "engine logout returned a non-success status"
                    );
                }
                Err(err) => {
                    warn!(
                        principal = %session.principal(),
                        error = %err,
                        "could not reach the engine to close the session"
                    );
                }
            }
        }
        session.clear();
    }
}
