//! Sign-in entry point.
//!
//! `GET /auth/login` starts a PKCE authorization-code flow at the identity
//! provider. The verifier stays in an HttpOnly cookie until the callback.

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pkce;
use crate::role::Role;

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub provider: Option<String>,
    pub signup: Option<String>,
    pub role: Option<String>,
}

/// `GET /auth/login?provider=google&signup=true&role=doctor`
pub async fn start(
    State(ctx): State<ApiContext>,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let provider = params
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(ctx.config.default_oauth_provider.as_str());
    if !provider
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::BadRequest(format!("Unknown sign-in provider: {provider}")));
    }

    let redirect_to = callback_url(
        &ctx.config.public_url,
        params.signup.as_deref() == Some("true"),
        params.role.as_deref().and_then(Role::parse),
    );

    let verifier = pkce::generate_verifier();
    let url = ctx
        .provider
        .authorize_url(provider, &redirect_to, &pkce::challenge(&verifier));

    tracing::debug!(provider, "starting sign-in");
    let jar = ctx.sessions.write_code_verifier(jar, &verifier);
    Ok((jar, Redirect::to(&url)))
}

/// Callback URL with the sign-up intent forwarded as query parameters.
fn callback_url(public_url: &str, signup: bool, role: Option<Role>) -> String {
    let mut url = format!("{public_url}/auth/callback");
    let mut query = Vec::new();
    if signup {
        query.push("signup=true".to_string());
    }
    if let Some(role) = role {
        query.push(format!("role={role}"));
    }
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_forwards_signup_intent() {
        assert_eq!(
            callback_url("https://care.example", false, None),
            "https://care.example/auth/callback"
        );
        assert_eq!(
            callback_url("https://care.example", true, Some(Role::Doctor)),
            "https://care.example/auth/callback?signup=true&role=doctor"
        );
    }
}
