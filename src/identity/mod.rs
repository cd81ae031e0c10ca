//! Identity provider boundary.
//!
//! The gateway never owns accounts: sessions, code exchange and metadata
//! updates all go through an `IdentityProvider`. `SupabaseAuthClient` talks to
//! a hosted GoTrue instance; `MockIdentityProvider` keeps everything in memory
//! for tests and local development.

pub mod mock;
pub mod supabase;
pub mod types;

pub use mock::MockIdentityProvider;
pub use supabase::SupabaseAuthClient;
pub use types::{Identity, MetadataPatch, Session, TokenPair};

use async_trait::async_trait;

/// Errors from identity provider calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Identity provider unreachable: {0}")]
    Transport(String),
    #[error("Identity provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Malformed identity provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// The provider answered and refused the credential (4xx).
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if (400..500).contains(status))
    }

    /// The provider could not be reached or failed on its side.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

/// Operations the authorization flow consumes from the identity provider.
///
/// All calls are async and may fail with a transport or auth error. An
/// update is never partially applied.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a one-time authorization code for a session.
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, ProviderError>;

    /// Trade a refresh token for a fresh session. Refresh tokens are single-use.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError>;

    /// Fetch the identity behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<Identity, ProviderError>;

    /// Merge `patch` into the identity's `user_metadata`.
    async fn update_user(
        &self,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> Result<Identity, ProviderError>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    /// URL that starts an OAuth sign-in with the given external provider.
    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_auth_rejections() {
        let err = ProviderError::Rejected {
            status: 400,
            message: "invalid_grant".into(),
        };
        assert!(err.is_auth_rejection());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn server_errors_count_as_unavailable() {
        let err = ProviderError::Rejected {
            status: 503,
            message: "upstream".into(),
        };
        assert!(!err.is_auth_rejection());
        assert!(err.is_unavailable());
        assert!(ProviderError::Transport("connection refused".into()).is_unavailable());
    }
}
