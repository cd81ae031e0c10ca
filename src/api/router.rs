//! Gateway router.
//!
//! Middleware stack (outermost → innermost):
//! 1. Extension(ApiContext) → 2. Audit logger → 3. Edge gatekeeper
//!
//! The records API adds `require_session` as a route layer, so unknown
//! paths under `/api` still 404 instead of 401.

use axum::http::header::X_CONTENT_TYPE_OPTIONS;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the gateway router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn build_router(ctx: ApiContext) -> Router {
    let records = Router::new()
        .route(
            "/:kind",
            get(endpoints::records::list).post(endpoints::records::create),
        )
        .route("/:kind/:id", get(endpoints::records::detail))
        .route_layer(axum::middleware::from_fn(
            middleware::session::require_session,
        ))
        .with_state(ctx.clone());

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone())
        .merge(records)
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    let auth = Router::new()
        .route("/login", get(endpoints::login::start))
        .route("/callback", get(endpoints::callback::exchange))
        .route(
            "/signout",
            axum::routing::post(endpoints::signout::sign_out),
        )
        .route(
            "/complete-profile",
            get(endpoints::profile::pending).post(endpoints::profile::complete),
        )
        .route("/error", get(endpoints::error_page::show))
        .with_state(ctx.clone());

    let dashboard = Router::new()
        .route("/dashboard", get(endpoints::dashboard::route_to_role))
        .route("/dashboard/:role", get(endpoints::dashboard::landing))
        .with_state(ctx.clone());

    Router::new()
        .nest("/api", api)
        .nest("/auth", auth)
        .merge(dashboard)
        .fallback_service(ServeDir::new(&ctx.config.static_dir))
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::gatekeeper::guard))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx))
}
