use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::role::Role;

/// Provider-side account record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-owned metadata (`provider`, `providers`, ...).
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    /// Free-form metadata writable through `update_user`.
    /// Carries `role` and `subscription_plan`.
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl Identity {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: None,
            app_metadata: Map::new(),
            user_metadata: Map::new(),
        }
    }

    /// Authentication provider tag (`google`, `email`, ...).
    pub fn provider(&self) -> Option<&str> {
        self.app_metadata.get("provider").and_then(Value::as_str)
    }

    /// Merge a metadata patch locally, the way the provider applies it.
    pub fn merge_metadata(&mut self, patch: &MetadataPatch) {
        for (key, value) in patch.fields() {
            self.user_metadata.insert(key.clone(), value.clone());
        }
    }
}

/// Partial `user_metadata` update sent to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataPatch(Map<String, Value>);

impl MetadataPatch {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// `{role, subscription_plan: "free"}` stamped on new accounts.
    pub fn role_stamp(role: Role) -> Self {
        Self::new()
            .with("role", Value::String(role.as_str().to_string()))
            .with("subscription_plan", Value::String("free".to_string()))
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bearer/refresh token pair. Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Live credential bound to exactly one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub tokens: TokenPair,
    /// Access token expiry, unix seconds.
    pub expires_at: i64,
    pub identity: Identity,
}

impl Session {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}
