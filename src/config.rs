//! Gateway configuration.
//!
//! Constants carry the defaults; `GatewayConfig::from_env()` reads the
//! deployment overrides (`CARELINK_*`, `SUPABASE_URL`, `SUPABASE_ANON_KEY`).

use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "CareLink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
pub const DEFAULT_OAUTH_PROVIDER: &str = "google";
pub const DEFAULT_COOKIE_PREFIX: &str = "cl";
pub const DEFAULT_STATIC_DIR: &str = "public";
/// Refresh the access token when it expires within this many seconds.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Origin of the payments widget embedded in the billing pages.
pub const PAYMENTS_ORIGIN: &str = "https://js.stripe.com";
pub const PAYMENTS_API_ORIGIN: &str = "https://api.stripe.com";
pub const PAYMENTS_HOOKS_ORIGIN: &str = "https://hooks.stripe.com";

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "carelink=info,tower_http=warn"
}

// ═══════════════════════════════════════════════════════════
// Policies
// ═══════════════════════════════════════════════════════════

/// Edge gating policy for the `/dashboard` subtree.
///
/// Exactly one policy is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Every protected path requires a session at the edge.
    Strict,
    /// Paths under `/dashboard` skip the edge session check; the
    /// dashboard handlers do their own session lookup.
    DashboardBypass,
}

impl EdgePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "dashboard-bypass" | "dashboard_bypass" => Some(Self::DashboardBypass),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::DashboardBypass => "dashboard-bypass",
        }
    }

    /// Whether this policy skips the edge session check for `path`.
    pub fn bypasses(self, path: &str) -> bool {
        match self {
            Self::Strict => false,
            Self::DashboardBypass => path == "/dashboard" || path.starts_with("/dashboard/"),
        }
    }
}

/// What the dashboard router does with an identity that carries no valid role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedRolePolicy {
    /// Route to the patient dashboard.
    DefaultPatient,
    /// Route to profile completion, same as the auth callback.
    CompleteProfile,
}

impl UnresolvedRolePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default-patient" | "default_patient" => Some(Self::DefaultPatient),
            "complete-profile" | "complete_profile" => Some(Self::CompleteProfile),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// GatewayConfig
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    /// Externally visible base URL, used to build the callback URL.
    pub public_url: String,
    /// Identity provider project URL (e.g. `https://xyz.supabase.co`).
    pub provider_url: String,
    pub provider_anon_key: String,
    pub default_oauth_provider: String,
    pub cookie_prefix: String,
    pub secure_cookies: bool,
    pub refresh_margin_secs: i64,
    pub provider_timeout_secs: u64,
    pub edge_policy: EdgePolicy,
    pub unresolved_role_policy: UnresolvedRolePolicy,
    pub static_dir: PathBuf,
    /// SQLite file for the records API. `None` keeps records in memory.
    pub database_path: Option<PathBuf>,
}

impl GatewayConfig {
    /// Defaults for a local deployment against the given provider project.
    pub fn local(provider_url: &str, anon_key: &str) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            provider_url: provider_url.trim_end_matches('/').to_string(),
            provider_anon_key: anon_key.to_string(),
            default_oauth_provider: DEFAULT_OAUTH_PROVIDER.to_string(),
            cookie_prefix: DEFAULT_COOKIE_PREFIX.to_string(),
            secure_cookies: false,
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            edge_policy: EdgePolicy::Strict,
            unresolved_role_policy: UnresolvedRolePolicy::DefaultPatient,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            database_path: None,
        }
    }

    /// Load from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_url = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        if reqwest::Url::parse(&provider_url).is_err() {
            return Err(ConfigError::Invalid {
                key: "SUPABASE_URL",
                value: provider_url,
            });
        }
        let anon_key =
            get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let mut config = Self::local(&provider_url, &anon_key);

        if let Some(addr) = get("CARELINK_BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::Invalid {
                key: "CARELINK_BIND_ADDR",
                value: addr.clone(),
            })?;
        }
        if let Some(url) = get("CARELINK_PUBLIC_URL") {
            config.public_url = url.trim_end_matches('/').to_string();
        }
        if let Some(provider) = get("CARELINK_OAUTH_PROVIDER") {
            config.default_oauth_provider = provider;
        }
        if let Some(prefix) = get("CARELINK_COOKIE_PREFIX") {
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(ConfigError::Invalid {
                    key: "CARELINK_COOKIE_PREFIX",
                    value: prefix,
                });
            }
            config.cookie_prefix = prefix;
        }
        if let Some(flag) = get("CARELINK_SECURE_COOKIES") {
            config.secure_cookies = parse_bool(&flag).ok_or(ConfigError::Invalid {
                key: "CARELINK_SECURE_COOKIES",
                value: flag.clone(),
            })?;
        } else {
            config.secure_cookies = config.public_url.starts_with("https://");
        }
        if let Some(margin) = get("CARELINK_REFRESH_MARGIN_SECS") {
            config.refresh_margin_secs = margin
                .parse()
                .ok()
                .filter(|m: &i64| *m >= 0)
                .ok_or(ConfigError::Invalid {
                    key: "CARELINK_REFRESH_MARGIN_SECS",
                    value: margin.clone(),
                })?;
        }
        if let Some(timeout) = get("CARELINK_PROVIDER_TIMEOUT_SECS") {
            config.provider_timeout_secs = timeout
                .parse()
                .ok()
                .filter(|t: &u64| *t > 0)
                .ok_or(ConfigError::Invalid {
                    key: "CARELINK_PROVIDER_TIMEOUT_SECS",
                    value: timeout.clone(),
                })?;
        }
        if let Some(policy) = get("CARELINK_EDGE_POLICY") {
            config.edge_policy = EdgePolicy::parse(&policy).ok_or(ConfigError::Invalid {
                key: "CARELINK_EDGE_POLICY",
                value: policy.clone(),
            })?;
        }
        if let Some(policy) = get("CARELINK_UNRESOLVED_ROLE_POLICY") {
            config.unresolved_role_policy =
                UnresolvedRolePolicy::parse(&policy).ok_or(ConfigError::Invalid {
                    key: "CARELINK_UNRESOLVED_ROLE_POLICY",
                    value: policy.clone(),
                })?;
        }
        if let Some(dir) = get("CARELINK_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        config.database_path = get("CARELINK_DATABASE_PATH").map(PathBuf::from);

        Ok(config)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
