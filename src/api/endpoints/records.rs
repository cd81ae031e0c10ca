//! Record collections: appointments, prescriptions, reports, wellness metrics.
//!
//! Per kind:
//! - `GET /api/:kind`: the caller's records, newest first
//! - `POST /api/:kind`: create one (patients only)
//! - `GET /api/:kind/:id`: one of the caller's records

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{require_role, ApiContext, SessionContext};
use crate::db;
use crate::models::{Record, RecordKind};
use crate::role::Role;

const MAX_TITLE_CHARS: usize = 200;

#[derive(Serialize)]
pub struct RecordsResponse {
    pub kind: RecordKind,
    pub records: Vec<Record>,
}

fn parse_kind(slug: &str) -> Result<RecordKind, ApiError> {
    RecordKind::from_slug(slug).ok_or_else(|| ApiError::NotFound(format!("Unknown collection: {slug}")))
}

/// `GET /api/:kind`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(kind): Path<String>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let records = {
        let conn = ctx.open_db()?;
        db::list_records(&conn, &session.identity().id, kind)?
    };

    Ok(Json(RecordsResponse { kind, records }))
}

/// `GET /api/:kind/:id`
///
/// Records of other owners or other kinds are reported as missing.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Record>, ApiError> {
    let kind = parse_kind(&kind)?;
    let not_found = || ApiError::NotFound("Record not found".into());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;

    let record = {
        let conn = ctx.open_db()?;
        db::get_record(&conn, &id)?
    };

    record
        .filter(|r| r.kind == kind && r.owner_id == session.identity().id)
        .map(Json)
        .ok_or_else(not_found)
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub title: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

#[derive(Serialize)]
pub struct CreateRecordResponse {
    pub record: Record,
}

/// `POST /api/:kind`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(kind): Path<String>,
    Json(req): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<CreateRecordResponse>), ApiError> {
    let kind = parse_kind(&kind)?;
    require_role(session.identity(), Role::Patient)?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }

    let record = Record::new(&session.identity().id, kind, title, req.body);
    {
        let conn = ctx.open_db()?;
        db::insert_record(&conn, &record)?;
    }
    tracing::info!(identity = %record.owner_id, kind = kind.as_str(), id = %record.id, "record created");

    Ok((StatusCode::CREATED, Json(CreateRecordResponse { record })))
}
