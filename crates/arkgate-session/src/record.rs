//! Session records and the shapes the registrar and validator return.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// "This user is logged in from this IP."
///
/// Built at registration time and uploaded to the remote store, which is
/// the system of record for it. Never updated: registering again uploads a
/// new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub ip: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub token_id: String,
}

impl SessionRecord {
    /// Creates a record stamped with the current time.
    pub fn new(ip: &str, username: &str, token_id: &str) -> Self {
        Self {
            ip: ip.to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
            token_id: token_id.to_string(),
        }
    }

    /// Remote blob name for a username's session.
    pub fn filename(username: &str) -> String {
        format!("session-{username}.json")
    }

    /// Decodes a record from what the remote store returned for a blob.
    ///
    /// The store may hand the content back as the JSON object itself, as a
    /// string holding the serialized object, or wrapped in `{"data": …}`.
    pub fn from_remote(body: &Value) -> Option<Self> {
        decode_nested(body, 3)
    }
}

fn decode_nested(body: &Value, depth: u8) -> Option<SessionRecord> {
    if depth == 0 {
        return None;
    }
    match body {
        Value::String(text) => {
            let inner: Value = serde_json::from_str(text).ok()?;
            decode_nested(&inner, depth - 1)
        }
        Value::Object(map) if map.contains_key("ip") => {
            serde_json::from_value(body.clone()).ok()
        }
        Value::Object(map) => decode_nested(map.get("data")?, depth - 1),
        _ => None,
    }
}

/// Pulls the identifier the remote store assigned out of an upload
/// response.
///
/// Tries, in order: `data.id`, `data._id`, `data.fileId`, `id`, `_id`,
/// `fileId`, `file_id`. Numeric ids are accepted and stringified.
pub(crate) fn extract_file_id(body: &Value) -> Option<String> {
    const POINTERS: [&str; 7] = [
        "/data/id",
        "/data/_id",
        "/data/fileId",
        "/id",
        "/_id",
        "/fileId",
        "/file_id",
    ];
    POINTERS.iter().find_map(|p| match body.pointer(p)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// RemoteEntry
// ---------------------------------------------------------------------------

/// Local pointer to a remote session record, keyed by the remote id.
///
/// Tells the validator which remote blobs belong to which username without
/// fetching them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub username: String,
    pub token_id: String,
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Result of a successful session registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Identifier the remote store assigned to the record.
    pub file_id: String,
    pub session: SessionRecord,
    /// Whether reading the record back confirmed the stored IP.
    /// `false` is a warning, not a failure.
    pub verified: bool,
    /// The upload response body, as returned by the store.
    pub remote_meta: Value,
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Why a session check said no.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No registered session for the username, or its record is gone.
    NoSession,
    /// The session was registered from a different IP.
    IpMismatch,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::IpMismatch => "ip_mismatch",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating a username's session against a client IP.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Allowed {
        file_id: String,
        session: SessionRecord,
    },
    Denied(DenyReason),
}

impl SessionStatus {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// The deny reason, if denied.
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allowed { .. } => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}

/// Serialized flat, the way HTTP clients expect it:
/// `{"allowed": true, "fileId": …, "session": …}` or
/// `{"allowed": false, "reason": "ip_mismatch"}`.
impl Serialize for SessionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Allowed { file_id, session } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("allowed", &true)?;
                map.serialize_entry("fileId", file_id)?;
                map.serialize_entry("session", session)?;
                map.end()
            }
            Self::Denied(reason) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("allowed", &false)?;
                map.serialize_entry("reason", reason)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> SessionRecord {
        SessionRecord::new("1.2.3.4", "alice", "tok")
    }

    #[test]
    fn test_extract_file_id_prefers_nested_data_id() {
        let body = json!({"id": "top", "data": {"id": "nested"}});
        assert_eq!(extract_file_id(&body).as_deref(), Some("nested"));
    }

    #[test]
    fn test_extract_file_id_falls_back_to_top_level_variants() {
        assert_eq!(extract_file_id(&json!({"_id": "a"})).as_deref(), Some("a"));
        assert_eq!(extract_file_id(&json!({"fileId": "b"})).as_deref(), Some("b"));
        assert_eq!(extract_file_id(&json!({"data": {"_id": 7}})).as_deref(), Some("7"));
    }

    #[test]
    fn test_extract_file_id_skips_empty_and_missing() {
        assert_eq!(extract_file_id(&json!({"data": {"id": ""}, "id": "x"})).as_deref(), Some("x"));
        assert_eq!(extract_file_id(&json!({"message": "ok"})), None);
        assert_eq!(extract_file_id(&Value::Null), None);
    }

    #[test]
    fn test_from_remote_accepts_plain_object() {
        let body = serde_json::to_value(record()).unwrap();
        assert_eq!(SessionRecord::from_remote(&body).unwrap().ip, "1.2.3.4");
    }

    #[test]
    fn test_from_remote_accepts_serialized_string() {
        let body = Value::String(serde_json::to_string(&record()).unwrap());
        assert_eq!(SessionRecord::from_remote(&body).unwrap().username, "alice");
    }

    #[test]
    fn test_from_remote_accepts_data_wrapper_with_string() {
        let inner = serde_json::to_string(&record()).unwrap();
        let body = json!({"data": inner});
        assert_eq!(SessionRecord::from_remote(&body).unwrap().token_id, "tok");
    }

    #[test]
    fn test_from_remote_rejects_record_without_ip() {
        assert!(SessionRecord::from_remote(&json!({"username": "alice"})).is_none());
        assert!(SessionRecord::from_remote(&json!("not json")).is_none());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["tokenId"], "tok");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_session_status_serializes_flat() {
        let denied = serde_json::to_value(SessionStatus::Denied(DenyReason::IpMismatch)).unwrap();
        assert_eq!(denied, json!({"allowed": false, "reason": "ip_mismatch"}));

        let allowed = serde_json::to_value(SessionStatus::Allowed {
            file_id: "f1".into(),
            session: record(),
        })
        .unwrap();
        assert_eq!(allowed["allowed"], true);
        assert_eq!(allowed["fileId"], "f1");
        assert_eq!(allowed["session"]["ip"], "1.2.3.4");
    }

    #[test]
    fn test_deny_reason_display_matches_wire_name() {
        assert_eq!(DenyReason::NoSession.to_string(), "no_session");
        assert_eq!(
            serde_json::to_value(DenyReason::NoSession).unwrap(),
            json!("no_session")
        );
    }
}
