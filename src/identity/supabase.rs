//! GoTrue (Supabase Auth) HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::types::{Identity, MetadataPatch, Session, TokenPair};
use super::{IdentityProvider, ProviderError};
use crate::config::GatewayConfig;

const AUTH_PREFIX: &str = "/auth/v1";

/// Fallback lifetime when the token response omits both expiry fields.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// HTTP client for a hosted GoTrue instance.
pub struct SupabaseAuthClient {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl SupabaseAuthClient {
    pub fn new(base_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ProviderError> {
        Self::new(
            &config.provider_url,
            &config.provider_anon_key,
            config.provider_timeout_secs,
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{AUTH_PREFIX}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Transport(format!("request to {} timed out", self.base_url))
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    async fn token_grant<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<Session, ProviderError> {
        let request = self
            .client
            .post(self.endpoint("/token"))
            .query(&[("grant_type", grant_type)])
            .json(body);
        let response: TokenResponse = self.send_json(request).await?;
        response.into_session(chrono::Utc::now().timestamp())
    }
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct UpdateUserRequest<'a> {
    data: &'a MetadataPatch,
}

/// Token endpoint response body.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<Identity>,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Result<Session, ProviderError> {
        let identity = self
            .user
            .filter(|u| !u.id.is_empty())
            .ok_or_else(|| ProviderError::Malformed("token response carried no user".into()))?;
        if self.access_token.is_empty() {
            return Err(ProviderError::Malformed("empty access token".into()));
        }
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));

        Ok(Session {
            tokens: TokenPair::new(self.access_token, self.refresh_token),
            expires_at,
            identity,
        })
    }
}

/// Error body shapes GoTrue returns across versions.
#[derive(Deserialize, Default)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

fn rejection(status: StatusCode, body: &str) -> ProviderError {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| body.chars().take(200).collect());
    ProviderError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, ProviderError> {
        self.token_grant(
            "pkce",
            &PkceGrant {
                auth_code: code,
                code_verifier,
            },
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        self.token_grant("refresh_token", &RefreshGrant { refresh_token })
            .await
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, ProviderError> {
        let request = self
            .client
            .get(self.endpoint("/user"))
            .bearer_auth(access_token);
        self.send_json(request).await
    }

    async fn update_user(
        &self,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> Result<Identity, ProviderError> {
        let request = self
            .client
            .put(self.endpoint("/user"))
            .bearer_auth(access_token)
            .json(&UpdateUserRequest { data: patch });
        self.send_json(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let request = self
            .client
            .post(self.endpoint("/logout"))
            .bearer_auth(access_token);
        self.send(request).await.map(|_| ())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "{}?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            self.endpoint("/authorize"),
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to),
            urlencoding::encode(code_challenge),
        )
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
