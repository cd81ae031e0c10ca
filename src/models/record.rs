use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RecordKind;

/// One stored entry of a patient record collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: RecordKind,
    pub title: String,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn new(owner_id: &str, kind: RecordKind, title: &str, body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            kind,
            title: title.to_string(),
            body,
            created_at: Utc::now(),
        }
    }
}
