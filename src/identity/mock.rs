//! In-memory identity provider.
//!
//! Behaves like the hosted provider where the authorization flow can tell the
//! difference: codes are single-use, refresh tokens rotate, expired access
//! tokens are rejected, metadata updates merge.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::types::{Identity, MetadataPatch, Session, TokenPair};
use super::{IdentityProvider, ProviderError};

const MOCK_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Default)]
struct MockState {
    users: HashMap<String, Identity>,
    /// code → identity id
    codes: HashMap<String, String>,
    /// access token → (identity id, expires_at)
    access_tokens: HashMap<String, (String, i64)>,
    /// refresh token → identity id
    refresh_tokens: HashMap<String, String>,
    next_token: u64,
    token_ttl_secs: Option<i64>,
    unavailable: bool,
    fail_updates: bool,
    update_calls: usize,
    sign_out_calls: usize,
}

impl MockState {
    fn issue(&mut self, user_id: &str, now: i64) -> Option<Session> {
        let identity = self.users.get(user_id)?.clone();
        self.next_token += 1;
        let access = format!("mock-access-{}", self.next_token);
        let refresh = format!("mock-refresh-{}", self.next_token);
        let expires_at = now + self.token_ttl_secs.unwrap_or(MOCK_TOKEN_TTL_SECS);

        self.access_tokens
            .insert(access.clone(), (user_id.to_string(), expires_at));
        self.refresh_tokens.insert(refresh.clone(), user_id.to_string());

        Some(Session {
            tokens: TokenPair::new(access, refresh),
            expires_at,
            identity,
        })
    }

    fn user_for_access(&self, access_token: &str, now: i64) -> Result<String, ProviderError> {
        match self.access_tokens.get(access_token) {
            Some((user_id, expires_at)) if *expires_at > now => Ok(user_id.clone()),
            Some(_) => Err(rejected(401, "token is expired")),
            None => Err(rejected(401, "invalid JWT")),
        }
    }
}

fn rejected(status: u16, message: &str) -> ProviderError {
    ProviderError::Rejected {
        status,
        message: message.to_string(),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// In-memory `IdentityProvider` for tests and local development.
#[derive(Default)]
pub struct MockIdentityProvider {
    state: Mutex<MockState>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register (or replace) an identity.
    pub fn add_user(&self, identity: Identity) {
        self.state().users.insert(identity.id.clone(), identity);
    }

    /// Current provider-side view of an identity.
    pub fn user(&self, id: &str) -> Option<Identity> {
        self.state().users.get(id).cloned()
    }

    /// Issue a one-time authorization code for `user_id`.
    pub fn issue_code(&self, user_id: &str) -> String {
        let mut state = self.state();
        state.next_token += 1;
        let code = format!("mock-code-{}", state.next_token);
        state.codes.insert(code.clone(), user_id.to_string());
        code
    }

    /// Issue a session directly, as if the user had just signed in.
    pub fn issue_session(&self, user_id: &str) -> Option<Session> {
        self.state().issue(user_id, now())
    }

    /// Lifetime of access tokens issued from now on.
    pub fn set_token_ttl(&self, secs: i64) {
        self.state().token_ttl_secs = Some(secs);
    }

    /// Make every call fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Make `update_user` fail with a server error.
    pub fn fail_metadata_updates(&self, fail: bool) {
        self.state().fail_updates = fail;
    }

    pub fn update_calls(&self) -> usize {
        self.state().update_calls
    }

    pub fn sign_out_calls(&self) -> usize {
        self.state().sign_out_calls
    }

    fn available(&self) -> Result<MutexGuard<'_, MockState>, ProviderError> {
        let state = self.state();
        if state.unavailable {
            return Err(ProviderError::Transport("connection refused".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<Session, ProviderError> {
        let mut state = self.available()?;
        let user_id = state
            .codes
            .remove(code)
            .ok_or_else(|| rejected(400, "invalid flow state, no valid flow state found"))?;
        state
            .issue(&user_id, now())
            .ok_or_else(|| rejected(404, "user not found"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let mut state = self.available()?;
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| rejected(400, "Invalid Refresh Token: Already Used"))?;
        state
            .issue(&user_id, now())
            .ok_or_else(|| rejected(404, "user not found"))
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, ProviderError> {
        let state = self.available()?;
        let user_id = state.user_for_access(access_token, now())?;
        state
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| rejected(404, "user not found"))
    }

    async fn update_user(
        &self,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> Result<Identity, ProviderError> {
        let mut state = self.available()?;
        state.update_calls += 1;
        if state.fail_updates {
            return Err(rejected(500, "database error updating user"));
        }
        let user_id = state.user_for_access(access_token, now())?;
        let identity = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| rejected(404, "user not found"))?;
        identity.merge_metadata(patch);
        Ok(identity.clone())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let mut state = self.available()?;
        state.sign_out_calls += 1;
        let user_id = state.user_for_access(access_token, now())?;
        state.access_tokens.retain(|_, (uid, _)| *uid != user_id);
        state.refresh_tokens.retain(|_, uid| *uid != user_id);
        Ok(())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "https://idp.invalid/authorize?provider={}&redirect_to={}&code_challenge={}",
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to),
            urlencoding::encode(code_challenge),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider_with_user() -> MockIdentityProvider {
        let provider = MockIdentityProvider::new();
        provider.add_user(Identity::new("u1"));
        provider
    }

    #[tokio::test]
    async fn codes_are_single_use() {
        let provider = provider_with_user();
        let code = provider.issue_code("u1");

        let session = provider.exchange_code_for_session(&code, None).await.unwrap();
        assert_eq!(session.identity.id, "u1");

        let err = provider
            .exchange_code_for_session(&code, None)
            .await
            .unwrap_err();
        assert!(err.is_auth_rejection());
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() {
        let provider = provider_with_user();
        let first = provider.issue_session("u1").unwrap();

        let second = provider
            .refresh_session(&first.tokens.refresh_token)
            .await
            .unwrap();
        assert_ne!(first.tokens.access_token, second.tokens.access_token);
        assert!(provider
            .refresh_session(&first.tokens.refresh_token)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let provider = provider_with_user();
        provider.set_token_ttl(-10);
        let session = provider.issue_session("u1").unwrap();

        let err = provider
            .get_user(&session.tokens.access_token)
            .await
            .unwrap_err();
        assert!(err.is_auth_rejection());
    }

    #[tokio::test]
    async fn update_merges_metadata() {
        let provider = provider_with_user();
        let session = provider.issue_session("u1").unwrap();

        provider
            .update_user(
                &session.tokens.access_token,
                &MetadataPatch::new().with("role", json!("doctor")),
            )
            .await
            .unwrap();

        assert_eq!(provider.user("u1").unwrap().user_metadata["role"], "doctor");
        assert_eq!(provider.update_calls(), 1);
    }

    #[tokio::test]
    async fn unavailable_provider_fails_with_transport() {
        let provider = provider_with_user();
        provider.set_unavailable(true);
        let err = provider.get_user("anything").await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn sign_out_revokes_all_tokens() {
        let provider = provider_with_user();
        let session = provider.issue_session("u1").unwrap();

        provider.sign_out(&session.tokens.access_token).await.unwrap();

        assert!(provider.get_user(&session.tokens.access_token).await.is_err());
        assert!(provider
            .refresh_session(&session.tokens.refresh_token)
            .await
            .is_err());
    }
}
