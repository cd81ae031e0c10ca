//! Session store adapter.
//!
//! Sessions live in cookies: access token, refresh token, expiry. The
//! adapter turns a request's cookie jar into `Option<Session>`:
//! - no session cookies → `Ok(None)`, the provider is not contacted
//! - access token near expiry → refreshed transparently (`refreshed = true`,
//!   the caller re-issues cookies)
//! - provider rejects the credential → `Ok(None)`
//! - provider unreachable → `Err`
//!
//! Absence of a session is a value, never an error.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::GatewayConfig;
use crate::identity::{IdentityProvider, ProviderError, Session};

/// Session cookies outlive the access token; the refresh token keeps them useful.
const SESSION_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 3600;
const CODE_VERIFIER_MAX_AGE_SECS: i64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session lookup failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone)]
pub struct SessionLookup {
    pub session: Session,
    /// Tokens were rotated during the lookup; cookies must be re-issued.
    pub refreshed: bool,
}

/// Cookie names derived from the configured prefix.
#[derive(Debug, Clone)]
pub struct CookieNames {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
    pub code_verifier: String,
}

impl CookieNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            access_token: format!("{prefix}-access-token"),
            refresh_token: format!("{prefix}-refresh-token"),
            expires_at: format!("{prefix}-expires-at"),
            code_verifier: format!("{prefix}-code-verifier"),
        }
    }
}

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    names: CookieNames,
    secure: bool,
    refresh_margin_secs: i64,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: &GatewayConfig) -> Self {
        Self {
            provider,
            names: CookieNames::with_prefix(&config.cookie_prefix),
            secure: config.secure_cookies,
            refresh_margin_secs: config.refresh_margin_secs,
        }
    }

    pub fn cookie_names(&self) -> &CookieNames {
        &self.names
    }

    /// Resolve the session carried by `jar`.
    pub async fn get_session(&self, jar: &CookieJar) -> Result<Option<SessionLookup>, SessionError> {
        let access = cookie_value(jar, &self.names.access_token);
        let refresh = cookie_value(jar, &self.names.refresh_token);
        if access.is_none() && refresh.is_none() {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp();
        let expires_at = cookie_value(jar, &self.names.expires_at).and_then(|v| v.parse::<i64>().ok());

        let needs_refresh = match (&access, expires_at) {
            (None, _) => true,
            (Some(_), Some(exp)) => exp - self.refresh_margin_secs <= now,
            (Some(_), None) => false,
        };

        if needs_refresh {
            let Some(refresh_token) = refresh else {
                tracing::debug!("access token expired and no refresh token present");
                return Ok(None);
            };
            return match self.provider.refresh_session(&refresh_token).await {
                Ok(session) => {
                    tracing::debug!(identity = %session.identity.id, "session refreshed");
                    Ok(Some(SessionLookup {
                        session,
                        refreshed: true,
                    }))
                }
                Err(err) if err.is_auth_rejection() => {
                    tracing::debug!(error = %err, "refresh token rejected");
                    Ok(None)
                }
                Err(err) => Err(err.into()),
            };
        }

        let Some(access_token) = access else {
            return Ok(None);
        };
        match self.provider.get_user(&access_token).await {
            Ok(identity) if !identity.id.is_empty() => Ok(Some(SessionLookup {
                session: Session {
                    tokens: crate::identity::TokenPair::new(access_token, refresh.unwrap_or_default()),
                    expires_at: expires_at.unwrap_or(now),
                    identity,
                },
                refreshed: false,
            })),
            Ok(_) => Ok(None),
            Err(err) if err.is_auth_rejection() => {
                tracing::debug!(error = %err, "access token rejected");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the session cookies for `session`.
    pub fn write_session(&self, jar: CookieJar, session: &Session) -> CookieJar {
        jar.add(self.cookie(&self.names.access_token, &session.tokens.access_token, SESSION_COOKIE_MAX_AGE_SECS))
            .add(self.cookie(&self.names.refresh_token, &session.tokens.refresh_token, SESSION_COOKIE_MAX_AGE_SECS))
            .add(self.cookie(&self.names.expires_at, &session.expires_at.to_string(), SESSION_COOKIE_MAX_AGE_SECS))
    }

    /// Remove all session cookies.
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(self.removal(&self.names.access_token))
            .remove(self.removal(&self.names.refresh_token))
            .remove(self.removal(&self.names.expires_at))
    }

    pub fn access_token(&self, jar: &CookieJar) -> Option<String> {
        cookie_value(jar, &self.names.access_token)
    }

    pub fn code_verifier(&self, jar: &CookieJar) -> Option<String> {
        cookie_value(jar, &self.names.code_verifier)
    }

    pub fn write_code_verifier(&self, jar: CookieJar, verifier: &str) -> CookieJar {
        jar.add(self.cookie(&self.names.code_verifier, verifier, CODE_VERIFIER_MAX_AGE_SECS))
    }

    pub fn clear_code_verifier(&self, jar: CookieJar) -> CookieJar {
        jar.remove(self.removal(&self.names.code_verifier))
    }

    fn cookie(&self, name: &str, value: &str, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name.to_string(), value.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }

    fn removal(&self, name: &str) -> Cookie<'static> {
        Cookie::build((name.to_string(), String::new())).path("/").build()
    }
}

fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, MockIdentityProvider};
    use axum::http::{header, HeaderMap, HeaderValue};

    fn store(provider: Arc<MockIdentityProvider>) -> SessionStore {
        let config = GatewayConfig::local("https://project.supabase.co", "anon");
        SessionStore::new(provider, &config)
    }

    fn jar_with(pairs: &[(&str, String)]) -> CookieJar {
        let cookie = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        CookieJar::from_headers(&headers)
    }

    fn jar_for(session: &Session) -> CookieJar {
        jar_with(&[
            ("cl-access-token", session.tokens.access_token.clone()),
            ("cl-refresh-token", session.tokens.refresh_token.clone()),
            ("cl-expires-at", session.expires_at.to_string()),
        ])
    }

    fn provider() -> Arc<MockIdentityProvider> {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.add_user(Identity::new("u1"));
        provider
    }

    #[tokio::test]
    async fn no_cookies_is_no_session_without_provider_call() {
        let provider = provider();
        provider.set_unavailable(true);
        let store = store(provider);

        let result = store.get_session(&CookieJar::new()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn valid_cookies_resolve_identity() {
        let provider = provider();
        let session = provider.issue_session("u1").unwrap();
        let store = store(provider);

        let lookup = store.get_session(&jar_for(&session)).await.unwrap().unwrap();
        assert_eq!(lookup.session.identity.id, "u1");
        assert!(!lookup.refreshed);
        assert_eq!(lookup.session.tokens, session.tokens);
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed_transparently() {
        let provider = provider();
        provider.set_token_ttl(30); // inside the 60s refresh margin
        let session = provider.issue_session("u1").unwrap();
        provider.set_token_ttl(3600);
        let store = store(provider);

        let lookup = store.get_session(&jar_for(&session)).await.unwrap().unwrap();
        assert!(lookup.refreshed);
        assert_eq!(lookup.session.identity.id, "u1");
        assert_ne!(lookup.session.tokens.access_token, session.tokens.access_token);
    }

    #[tokio::test]
    async fn refresh_token_alone_restores_session() {
        let provider = provider();
        let session = provider.issue_session("u1").unwrap();
        let store = store(provider);

        let jar = jar_with(&[("cl-refresh-token", session.tokens.refresh_token.clone())]);
        let lookup = store.get_session(&jar).await.unwrap().unwrap();
        assert!(lookup.refreshed);
    }

    #[tokio::test]
    async fn revoked_token_is_absence_not_error() {
        let provider = provider();
        let session = provider.issue_session("u1").unwrap();
        let jar = jar_with(&[("cl-access-token", session.tokens.access_token.clone())]);
        crate::identity::IdentityProvider::sign_out(provider.as_ref(), &session.tokens.access_token)
            .await
            .unwrap();
        let store = store(provider);

        assert!(matches!(store.get_session(&jar).await, Ok(None)));
    }

    #[tokio::test]
    async fn provider_outage_is_an_error() {
        let provider = provider();
        let session = provider.issue_session("u1").unwrap();
        provider.set_unavailable(true);
        let store = store(provider);

        let result = store.get_session(&jar_for(&session)).await;
        assert!(matches!(
            result,
            Err(SessionError::Provider(ProviderError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn written_cookies_round_trip_through_lookup() {
        let provider = provider();
        let session = provider.issue_session("u1").unwrap();
        let store = store(provider);

        let jar = store.write_session(CookieJar::new(), &session);
        let cookie = jar.get("cl-access-token").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));

        let lookup = store.get_session(&jar).await.unwrap().unwrap();
        assert_eq!(lookup.session.identity.id, "u1");
    }

    #[test]
    fn cookie_names_follow_prefix() {
        let names = CookieNames::with_prefix("care");
        assert_eq!(names.access_token, "care-access-token");
        assert_eq!(names.code_verifier, "care-code-verifier");
    }
}
