//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub edge_policy: &'static str,
    pub schema_version: i64,
}

/// `GET /api/health`: liveness probe. Public, never contacts the provider.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let schema_version = db::schema_version(&*ctx.open_db()?);

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        edge_policy: ctx.config.edge_policy.as_str(),
        schema_version,
    }))
}
