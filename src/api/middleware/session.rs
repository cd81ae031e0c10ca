//! Session requirement for the JSON API.
//!
//! Reuses the `SessionContext` the gatekeeper resolved; otherwise looks the
//! session up from cookies. No session answers `401 AUTH_REQUIRED` instead of
//! a redirect, since API callers are scripts, not browsers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::api::error::ApiError;
use crate::api::types::{resolve_session, ApiContext, SessionContext};

/// Require a live session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
/// On success: injects `SessionContext`, re-issues cookies after a refresh.
pub async fn require_session(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let existing = req.extensions().get::<SessionContext>().cloned();
    let reused = existing.is_some();
    let jar = CookieJar::from_headers(req.headers());

    let (session, jar) = resolve_session(&ctx, existing, jar).await?;
    let session = session.ok_or(ApiError::Unauthorized)?;

    if !reused {
        req.extensions_mut().insert(session);
    }

    let response = next.run(req).await;
    Ok((jar, response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    use crate::config::GatewayConfig;
    use crate::db::open_memory_database;
    use crate::identity::{Identity, MockIdentityProvider, Session};

    fn app() -> (Router, Arc<MockIdentityProvider>) {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.add_user(Identity::new("u1"));
        let ctx = ApiContext::new(
            GatewayConfig::local("https://project.supabase.co", "anon"),
            provider.clone(),
            open_memory_database().unwrap(),
        );
        let router = Router::new()
            .route(
                "/probe",
                get(|Extension(session): Extension<SessionContext>| async move {
                    session.identity().id.clone()
                }),
            )
            .layer(axum::middleware::from_fn(require_session))
            .layer(Extension(ctx));
        (router, provider)
    }

    fn probe(session: Option<&Session>) -> Request<Body> {
        let mut builder = Request::builder().uri("/probe");
        if let Some(session) = session {
            builder = builder.header(
                COOKIE,
                format!(
                    "cl-access-token={}; cl-refresh-token={}; cl-expires-at={}",
                    session.tokens.access_token, session.tokens.refresh_token, session.expires_at
                ),
            );
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_session_is_401_json() {
        let (app, _) = app();
        let response = app.oneshot(probe(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn live_session_reaches_handler() {
        let (app, provider) = app();
        let session = provider.issue_session("u1").unwrap();
        let response = app.oneshot(probe(Some(&session))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], &b"u1"[..]);
    }

    #[tokio::test]
    async fn refreshed_session_sets_cookies() {
        let (app, provider) = app();
        provider.set_token_ttl(10);
        let session = provider.issue_session("u1").unwrap();
        provider.set_token_ttl(3600);

        let response = app.oneshot(probe(Some(&session))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().starts_with("cl-access-token=")));
    }

    #[tokio::test]
    async fn revoked_session_is_401() {
        let (app, provider) = app();
        let session = provider.issue_session("u1").unwrap();
        crate::identity::IdentityProvider::sign_out(provider.as_ref(), &session.tokens.access_token)
            .await
            .unwrap();
        let response = app.oneshot(probe(Some(&session))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
