//! `POST /auth/signout`: revoke at the provider (best effort), forget the
//! cached role, clear cookies, back to sign-in.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::api::route_class::SIGN_IN_PATH;
use crate::api::types::ApiContext;

pub async fn sign_out(State(ctx): State<ApiContext>, jar: CookieJar) -> Response {
    match ctx.sessions.get_session(&jar).await {
        Ok(Some(lookup)) => {
            let identity_id = &lookup.session.identity.id;
            ctx.roles.invalidate(identity_id);
            if let Err(err) = ctx.provider.sign_out(&lookup.session.tokens.access_token).await {
                tracing::warn!(identity = %identity_id, error = %err, "provider sign-out failed");
            }
            tracing::info!(identity = %identity_id, "signed out");
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "session lookup failed during sign-out"),
    }

    let jar = ctx.sessions.clear_session(jar);
    (jar, Redirect::to(SIGN_IN_PATH)).into_response()
}
