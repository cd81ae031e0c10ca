//! Auth callback: exchanges the authorization code for a session.
//!
//! `GET /auth/callback?code=..&signup=true&role=doctor`
//!
//! Outcomes:
//! - no code → `/auth/error?error=missing_code`
//! - code rejected (expired, reused, no identity) → `error=exchange_error`
//! - provider unreachable → `error=callback_error`
//! - role unresolved → `/auth/complete-profile`
//! - otherwise → `/dashboard/{role}`
//!
//! Sign-ups carrying a valid role get `{role, subscription_plan}` stamped on
//! the account, but only when the account has no valid role yet. The stamp
//! runs detached; the redirect is decided from the locally merged metadata
//! and never waits for it.
//!
//! A missing verifier cookie is forwarded as `None`; the provider rejects
//! the PKCE exchange, which surfaces as `exchange_error`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::api::error::AuthFlowError;
use crate::api::route_class::{COMPLETE_PROFILE_PATH, ERROR_PATH};
use crate::api::types::ApiContext;
use crate::identity::{IdentityProvider, MetadataPatch, Session};
use crate::role::{resolve_role, Role};

const CALLBACK_CACHE_CONTROL: &str = "no-store, max-age=0";

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub signup: Option<String>,
    pub role: Option<String>,
    /// Set by the provider when the user denied consent or the flow broke.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    fn code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn is_signup(&self) -> bool {
        self.signup.as_deref() == Some("true")
    }

    fn requested_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }
}

pub async fn exchange(
    State(ctx): State<ApiContext>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let verifier = ctx.sessions.code_verifier(&jar).map(Zeroizing::new);
    let jar = ctx.sessions.clear_code_verifier(jar);

    let (jar, target) = match sign_in(&ctx, &params, verifier.as_deref().map(String::as_str)).await
    {
        Ok((session, target)) => (ctx.sessions.write_session(jar, &session), target),
        Err(err) => {
            tracing::warn!(tag = err.error_tag(), error = %err, "sign-in callback failed");
            let target = err
                .redirect_target()
                .unwrap_or_else(|| format!("{ERROR_PATH}?error=callback_error"));
            (jar, target)
        }
    };

    (jar, [(CACHE_CONTROL, CALLBACK_CACHE_CONTROL)], Redirect::to(&target)).into_response()
}

/// Exchange, optional enrichment, role resolution. Returns the session and
/// the post-login target.
async fn sign_in(
    ctx: &ApiContext,
    params: &CallbackParams,
    verifier: Option<&str>,
) -> Result<(Session, String), AuthFlowError> {
    let Some(code) = params.code() else {
        if let Some(error) = &params.error {
            tracing::warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or_default(),
                "provider returned an error instead of a code"
            );
        }
        return Err(AuthFlowError::MissingCredential);
    };

    let mut session = ctx
        .provider
        .exchange_code_for_session(code, verifier)
        .await
        .map_err(AuthFlowError::from_exchange)?;
    if session.identity.id.is_empty() {
        return Err(AuthFlowError::ExchangeFailure(
            "session carries no identity".into(),
        ));
    }
    let identity_id = session.identity.id.clone();

    if let Some(role) = params.requested_role().filter(|_| params.is_signup()) {
        if let Some(existing) = resolve_role(&session.identity) {
            tracing::info!(
                identity = %identity_id,
                %existing,
                requested = %role,
                "sign-up role ignored, account already has a role"
            );
        } else {
            let patch = MetadataPatch::role_stamp(role);
            session.identity.merge_metadata(&patch);
            ctx.roles.invalidate(&identity_id);
            spawn_enrichment(
                ctx.provider.clone(),
                Zeroizing::new(session.tokens.access_token.clone()),
                identity_id.clone(),
                patch,
            );
        }
    }

    let target = match resolve_role(&session.identity) {
        Some(role) => {
            ctx.roles.remember(&identity_id, role);
            tracing::info!(identity = %identity_id, %role, "signed in");
            role.dashboard_path()
        }
        None => {
            tracing::info!(
                identity = %identity_id,
                reason = %AuthFlowError::UnresolvedRole,
                "signed in, routing to profile completion"
            );
            AuthFlowError::UnresolvedRole
                .redirect_target()
                .unwrap_or_else(|| COMPLETE_PROFILE_PATH.to_string())
        }
    };

    Ok((session, target))
}

/// Fire-and-forget metadata stamp. Failure is logged, never surfaced.
fn spawn_enrichment(
    provider: Arc<dyn IdentityProvider>,
    access_token: Zeroizing<String>,
    identity_id: String,
    patch: MetadataPatch,
) {
    tokio::spawn(async move {
        match provider.update_user(&access_token, &patch).await {
            Ok(_) => tracing::debug!(identity = %identity_id, "account metadata stamped"),
            Err(err) => {
                let failure = AuthFlowError::EnrichmentFailure(err.to_string());
                tracing::warn!(identity = %identity_id, error = %failure, "continuing sign-in without metadata");
            }
        }
    });
}
