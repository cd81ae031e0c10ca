//! Role resolution from identity metadata.
//!
//! A role is one of `patient`, `doctor`, `clinic`. Anything else, or no
//! value at all, resolves to `None` ("unresolved"); callers decide what an
//! unresolved role means for routing.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Clinic,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Clinic];

    /// Case-insensitive parse. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            "clinic" => Some(Self::Clinic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Clinic => "clinic",
        }
    }

    /// Role-specific dashboard path.
    pub fn dashboard_path(self) -> String {
        format!("/dashboard/{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read `user_metadata.role` and validate it. Pure, never panics.
pub fn resolve_role(identity: &Identity) -> Option<Role> {
    identity
        .user_metadata
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity_with(metadata: Value) -> Identity {
        let mut identity = Identity::new("u1");
        if let Value::Object(map) = metadata {
            identity.user_metadata = map;
        }
        identity
    }

    #[test]
    fn uppercase_role_is_normalized() {
        let identity = identity_with(json!({ "role": "DOCTOR" }));
        assert_eq!(resolve_role(&identity), Some(Role::Doctor));
    }

    #[test]
    fn unknown_role_is_unresolved() {
        let identity = identity_with(json!({ "role": "admin" }));
        assert_eq!(resolve_role(&identity), None);
    }

    #[test]
    fn missing_role_is_unresolved() {
        assert_eq!(resolve_role(&identity_with(json!({}))), None);
    }

    #[test]
    fn non_string_role_is_unresolved() {
        assert_eq!(resolve_role(&identity_with(json!({ "role": 3 }))), None);
        assert_eq!(resolve_role(&identity_with(json!({ "role": null }))), None);
        assert_eq!(
            resolve_role(&identity_with(json!({ "role": ["doctor"] }))),
            None
        );
    }

    #[test]
    fn padded_role_is_trimmed() {
        let identity = identity_with(json!({ "role": "  Clinic " }));
        assert_eq!(resolve_role(&identity), Some(Role::Clinic));
    }

    #[test]
    fn dashboard_paths() {
        assert_eq!(Role::Patient.dashboard_path(), "/dashboard/patient");
        assert_eq!(Role::Doctor.dashboard_path(), "/dashboard/doctor");
        assert_eq!(Role::Clinic.dashboard_path(), "/dashboard/clinic");
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::ALL).unwrap(), json!(["patient", "doctor", "clinic"]));
    }
}
