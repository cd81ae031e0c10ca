//! Shared types for the HTTP layer.

use std::sync::{Arc, Mutex, MutexGuard};

use axum_extra::extract::cookie::CookieJar;
use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::api::security_headers::SecurityHeaders;
use crate::config::{GatewayConfig, UnresolvedRolePolicy};
use crate::identity::{Identity, IdentityProvider, Session};
use crate::role::{resolve_role, Role};
use crate::role_cache::RoleCache;
use crate::session::{SessionError, SessionStore};

// ═══════════════════════════════════════════════════════════
// API context: shared state for routes and middleware
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<GatewayConfig>,
    pub provider: Arc<dyn IdentityProvider>,
    pub sessions: Arc<SessionStore>,
    pub roles: RoleCache,
    pub security_headers: Arc<SecurityHeaders>,
    db: Arc<Mutex<Connection>>,
}

impl ApiContext {
    pub fn new(config: GatewayConfig, provider: Arc<dyn IdentityProvider>, conn: Connection) -> Self {
        let sessions = SessionStore::new(provider.clone(), &config);
        let security_headers = SecurityHeaders::from_config(&config);
        Self {
            config: Arc::new(config),
            provider,
            sessions: Arc::new(sessions),
            roles: RoleCache::new(),
            security_headers: Arc::new(security_headers),
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Lock the records database. Never hold the guard across `.await`.
    pub fn open_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }

    /// Role used for routing: cached, else resolved from metadata, else the
    /// configured fallback. `None` means "send to profile completion".
    pub fn effective_role(&self, identity: &Identity) -> Option<Role> {
        if let Some(role) = self.roles.get(&identity.id) {
            return Some(role);
        }
        if let Some(role) = resolve_role(identity) {
            return Some(role);
        }
        match self.config.unresolved_role_policy {
            UnresolvedRolePolicy::DefaultPatient => {
                tracing::info!(
                    identity = %identity.id,
                    "no valid role on identity, defaulting to patient"
                );
                Some(Role::Patient)
            }
            UnresolvedRolePolicy::CompleteProfile => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Session context: injected by the gatekeeper
// ═══════════════════════════════════════════════════════════

/// Session resolved by the gatekeeper (or `require_session`), placed in
/// request extensions so handlers never look it up twice. Refresh tokens are
/// single-use; a second lookup after a rotation would fail.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Arc<Session>,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.session.identity
    }
}

/// Session for a handler: the one already in extensions, or a fresh lookup.
///
/// The returned jar carries re-issued cookies when the lookup refreshed the
/// tokens; the handler must include it in its response.
pub async fn resolve_session(
    ctx: &ApiContext,
    existing: Option<SessionContext>,
    jar: CookieJar,
) -> Result<(Option<SessionContext>, CookieJar), SessionError> {
    if existing.is_some() {
        return Ok((existing, jar));
    }
    match ctx.sessions.get_session(&jar).await? {
        Some(lookup) => {
            let jar = if lookup.refreshed {
                ctx.sessions.write_session(jar, &lookup.session)
            } else {
                jar
            };
            Ok((Some(SessionContext::new(lookup.session)), jar))
        }
        None => Ok((None, jar)),
    }
}

/// Require a resolved role equal to `required`.
pub fn require_role(identity: &Identity, required: Role) -> Result<Role, ApiError> {
    match resolve_role(identity) {
        Some(role) if role == required => Ok(role),
        _ => Err(ApiError::Forbidden(format!(
            "This action requires the {required} role"
        ))),
    }
}
