use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Record, RecordKind};

pub fn insert_record(conn: &Connection, record: &Record) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO records (id, owner_id, kind, title, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id.to_string(),
            record.owner_id,
            record.kind.as_str(),
            record.title,
            record.body.to_string(),
            record.created_at,
        ],
    )?;
    Ok(())
}

/// Records of one kind owned by `owner_id`, newest first.
pub fn list_records(
    conn: &Connection,
    owner_id: &str,
    kind: RecordKind,
) -> Result<Vec<Record>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, kind, title, body, created_at FROM records
         WHERE owner_id = ?1 AND kind = ?2
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![owner_id, kind.as_str()], row_to_raw)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(raw_to_record(row?)?);
    }
    Ok(records)
}

pub fn get_record(conn: &Connection, id: &Uuid) -> Result<Option<Record>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, kind, title, body, created_at FROM records WHERE id = ?1",
    )?;
    match stmt.query_row(params![id.to_string()], row_to_raw) {
        Ok(raw) => raw_to_record(raw).map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

type RawRecord = (String, String, String, String, String, chrono::DateTime<chrono::Utc>);

fn row_to_raw(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn raw_to_record(raw: RawRecord) -> Result<Record, DatabaseError> {
    let (id, owner_id, kind, title, body, created_at) = raw;
    Ok(Record {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::CorruptColumn {
            column: "id",
            reason: e.to_string(),
        })?,
        owner_id,
        kind: kind.parse()?,
        title,
        body: serde_json::from_str(&body).map_err(|e| DatabaseError::CorruptColumn {
            column: "body",
            reason: e.to_string(),
        })?,
        created_at,
    })
}
