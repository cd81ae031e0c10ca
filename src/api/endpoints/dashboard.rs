//! Dashboard router.
//!
//! - `GET /dashboard`: forwards an established session to `/dashboard/{role}`
//! - `GET /dashboard/:role`: role landing; a session of another role is
//!   sent back through the router

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::route_class::{COMPLETE_PROFILE_PATH, SIGN_IN_PATH};
use crate::api::types::{resolve_session, ApiContext, SessionContext};
use crate::role::Role;

pub const DASHBOARD_PATH: &str = "/dashboard";

/// `GET /dashboard`
pub async fn route_to_role(
    State(ctx): State<ApiContext>,
    existing: Option<Extension<SessionContext>>,
    jar: CookieJar,
) -> Response {
    let (session, jar) = match resolve_session(&ctx, existing.map(|Extension(s)| s), jar).await {
        Ok((Some(session), jar)) => (session, jar),
        Ok((None, jar)) => return (jar, Redirect::to(SIGN_IN_PATH)).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "session lookup failed on dashboard, redirecting to sign-in");
            return Redirect::to(SIGN_IN_PATH).into_response();
        }
    };

    let identity = session.identity();
    let target = match ctx.effective_role(identity) {
        Some(role) => {
            ctx.roles.remember(&identity.id, role);
            role.dashboard_path()
        }
        None => COMPLETE_PROFILE_PATH.to_string(),
    };

    (jar, Redirect::to(&target)).into_response()
}

#[derive(Serialize)]
pub struct LandingResponse {
    pub role: Role,
    pub identity_id: String,
    pub email: Option<String>,
}

/// `GET /dashboard/:role`
pub async fn landing(
    State(ctx): State<ApiContext>,
    existing: Option<Extension<SessionContext>>,
    jar: CookieJar,
    Path(role): Path<String>,
) -> Result<Response, ApiError> {
    let requested = Role::parse(&role)
        .filter(|r| r.as_str() == role)
        .ok_or_else(|| ApiError::NotFound(format!("No dashboard for {role}")))?;

    let (session, jar) = resolve_session(&ctx, existing.map(|Extension(s)| s), jar).await?;
    let Some(session) = session else {
        return Ok((jar, Redirect::to(SIGN_IN_PATH)).into_response());
    };

    let identity = session.identity();
    if ctx.effective_role(identity) != Some(requested) {
        tracing::debug!(identity = %identity.id, %requested, "dashboard role mismatch");
        return Ok((jar, Redirect::to(DASHBOARD_PATH)).into_response());
    }

    let body = LandingResponse {
        role: requested,
        identity_id: identity.id.clone(),
        email: identity.email.clone(),
    };
    Ok((jar, Json(body)).into_response())
}
