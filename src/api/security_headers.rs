//! Content-Security-Policy and cache headers attached to every non-asset response.

use axum::http::header::{CACHE_CONTROL, CONTENT_SECURITY_POLICY};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::{GatewayConfig, PAYMENTS_API_ORIGIN, PAYMENTS_HOOKS_ORIGIN, PAYMENTS_ORIGIN};

pub const CACHE_CONTROL_NO_STORE: &str = "no-store, max-age=0, must-revalidate";

/// Placeholders in the directive table, filled from configuration.
const PROVIDER: &str = "{provider}";
const PROVIDER_WS: &str = "{provider_ws}";

const DIRECTIVES: &[(&str, &[&str])] = &[
    ("default-src", &["'self'"]),
    ("script-src", &["'self'", "'unsafe-inline'", PAYMENTS_ORIGIN]),
    ("style-src", &["'self'", "'unsafe-inline'"]),
    ("img-src", &["'self'", "data:", "blob:", PROVIDER]),
    ("font-src", &["'self'", "data:"]),
    (
        "connect-src",
        &["'self'", PROVIDER, PROVIDER_WS, PAYMENTS_API_ORIGIN],
    ),
    ("frame-src", &["'self'", PAYMENTS_ORIGIN, PAYMENTS_HOOKS_ORIGIN]),
    ("object-src", &["'none'"]),
];

/// Build the CSP string for a given identity-provider origin.
pub fn content_security_policy(provider_origin: &str) -> String {
    let provider_ws = provider_origin
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);

    DIRECTIVES
        .iter()
        .map(|(name, sources)| {
            let sources: Vec<&str> = sources
                .iter()
                .map(|s| match *s {
                    PROVIDER => provider_origin,
                    PROVIDER_WS => provider_ws.as_str(),
                    other => other,
                })
                .collect();
            format!("{name} {}", sources.join(" "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Precomputed header values.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    csp: HeaderValue,
    cache_control: HeaderValue,
}

impl SecurityHeaders {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let origin = reqwest::Url::parse(&config.provider_url)
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_else(|_| config.provider_url.clone());
        let csp = HeaderValue::from_str(&content_security_policy(&origin)).unwrap_or_else(|_| {
            tracing::warn!(origin, "provider origin not usable in CSP, using strict policy");
            HeaderValue::from_static("default-src 'self'; object-src 'none'")
        });

        Self {
            csp,
            cache_control: HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        }
    }

    /// Set the CSP. A handler's own `Cache-Control` is kept.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(CONTENT_SECURITY_POLICY, self.csp.clone());
        headers
            .entry(CACHE_CONTROL)
            .or_insert_with(|| self.cache_control.clone());
    }

    pub fn csp(&self) -> &HeaderValue {
        &self.csp
    }
}
