//! Profile completion for identities without a valid role.
//!
//! - `GET /auth/complete-profile`: what is pending
//! - `POST /auth/complete-profile`: stamp the chosen role, answer the redirect

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{resolve_session, ApiContext, SessionContext};
use crate::identity::MetadataPatch;
use crate::role::{resolve_role, Role};

#[derive(Serialize)]
pub struct PendingProfile {
    pub identity_id: String,
    pub email: Option<String>,
    pub current_role: Option<Role>,
    pub roles: [Role; 3],
}

/// `GET /auth/complete-profile`
pub async fn pending(State(ctx): State<ApiContext>, jar: CookieJar) -> Result<Response, ApiError> {
    let (session, jar) = signed_in(&ctx, jar).await?;
    let identity = session.identity();

    let body = PendingProfile {
        identity_id: identity.id.clone(),
        email: identity.email.clone(),
        current_role: resolve_role(identity),
        roles: Role::ALL,
    };
    Ok((jar, Json(body)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CompleteProfileRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct CompleteProfileResponse {
    pub redirect: String,
}

/// `POST /auth/complete-profile` with `{"role": "doctor"}`
///
/// Once the session is resolved, every outcome carries the jar: a lookup may
/// have rotated the refresh token, and dropping the new cookies would sign
/// the user out.
pub async fn complete(
    State(ctx): State<ApiContext>,
    jar: CookieJar,
    Json(req): Json<CompleteProfileRequest>,
) -> Result<Response, ApiError> {
    let role = Role::parse(&req.role)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown role: {}", req.role)))?;

    let (session, jar) = signed_in(&ctx, jar).await?;
    let outcome = stamp_role(&ctx, &session, role).await;
    Ok((jar, outcome).into_response())
}

async fn stamp_role(
    ctx: &ApiContext,
    session: &SessionContext,
    role: Role,
) -> Result<Json<CompleteProfileResponse>, ApiError> {
    let identity_id = session.identity().id.clone();
    if resolve_role(session.identity()).is_some() {
        return Err(ApiError::Forbidden("Role is already assigned".into()));
    }

    ctx.roles.invalidate(&identity_id);
    let updated = ctx
        .provider
        .update_user(&session.session.tokens.access_token, &MetadataPatch::role_stamp(role))
        .await?;

    // Trust the provider's answer, not the request.
    let role = resolve_role(&updated).unwrap_or(role);
    ctx.roles.remember(&identity_id, role);
    tracing::info!(identity = %identity_id, %role, "profile completed");

    Ok(Json(CompleteProfileResponse {
        redirect: role.dashboard_path(),
    }))
}

async fn signed_in(ctx: &ApiContext, jar: CookieJar) -> Result<(SessionContext, CookieJar), ApiError> {
    let (session, jar) = resolve_session(ctx, None, jar).await?;
    let session = session.ok_or(ApiError::Unauthorized)?;
    Ok((session, jar))
}
