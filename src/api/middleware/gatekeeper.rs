//! Edge gatekeeper.
//!
//! Runs once per request, before routing:
//! 1. static assets pass through untouched (no headers, no session check)
//! 2. every other response gets the CSP and cache headers
//! 3. public paths pass through
//! 4. protected paths need a session, else `303` to the sign-in entry point
//!
//! A failed session lookup (provider unreachable) is logged and the request
//! passes through; handlers that need a session check again.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::api::error::ApiError;
use crate::api::route_class::{classify, RouteClass, SIGN_IN_PATH};
use crate::api::types::{ApiContext, SessionContext};

/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn guard(req: Request<axum::body::Body>, next: Next) -> Response {
    let class = classify(req.uri().path());
    if class == RouteClass::StaticAsset {
        return next.run(req).await;
    }

    let Some(ctx) = req.extensions().get::<ApiContext>().cloned() else {
        return ApiError::Internal("missing API context".into()).into_response();
    };

    let mut response = match class {
        RouteClass::Protected if !ctx.config.edge_policy.bypasses(req.uri().path()) => {
            gate(&ctx, req, next).await
        }
        _ => next.run(req).await,
    };

    ctx.security_headers.apply(response.headers_mut());
    response
}

async fn gate(ctx: &ApiContext, mut req: Request<axum::body::Body>, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());

    match ctx.sessions.get_session(&jar).await {
        Ok(Some(lookup)) => {
            let reissued = lookup
                .refreshed
                .then(|| ctx.sessions.write_session(CookieJar::new(), &lookup.session));
            req.extensions_mut()
                .insert(SessionContext::new(lookup.session));

            let response = next.run(req).await;
            match reissued {
                Some(jar) => (jar, response).into_response(),
                None => response,
            }
        }
        Ok(None) => {
            tracing::debug!(path = %req.uri().path(), "no session, redirecting to sign-in");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
        Err(err) => {
            tracing::warn!(
                path = %req.uri().path(),
                error = %err,
                "session lookup failed, passing request through"
            );
            next.run(req).await
        }
    }
}
