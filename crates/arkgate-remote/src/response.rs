//! Request and response shapes shared by every [`RemoteStore`](crate::RemoteStore).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /upload/plain`.
///
/// `data` is the blob content as a string; the store keeps it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub data: String,
    pub filename: String,
    pub description: String,
}

/// What the remote store answered.
///
/// `body` is the response parsed as JSON. Bodies that aren't JSON are kept
/// as a JSON string so error text is never lost; an empty body is `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Value,
}

impl RemoteResponse {
    /// Creates a response from an already-parsed body.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Creates a response from raw body text.
    pub fn from_text(status: u16, text: String) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Self { status, body }
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401: the presented credential was rejected.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// 404: the blob does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// 400: Arkacdn's answer for a blob that exists but can't be served
    /// yet (still being processed after upload).
    pub fn is_not_ready(&self) -> bool {
        self.status == 400
    }

    /// Best human-readable error text in the body.
    ///
    /// Looks at `message`, `error` (string), `error.message`, then falls
    /// back to the whole body.
    pub fn error_message(&self) -> String {
        let candidates = [
            self.body.get("message"),
            self.body.get("error").filter(|v| v.is_string()),
            self.body.pointer("/error/message"),
        ];
        if let Some(text) = candidates.into_iter().flatten().find_map(Value::as_str) {
            return text.to_string();
        }
        match &self.body {
            Value::Null => format!("empty response (status {})", self.status),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_text_parses_json() {
        let resp = RemoteResponse::from_text(200, r#"{"id":"abc"}"#.into());
        assert_eq!(resp.body, json!({"id": "abc"}));
    }

    #[test]
    fn test_from_text_keeps_plain_text_as_string() {
        let resp = RemoteResponse::from_text(502, "Bad Gateway".into());
        assert_eq!(resp.body, Value::String("Bad Gateway".into()));
        assert_eq!(resp.error_message(), "Bad Gateway");
    }

    #[test]
    fn test_from_text_empty_body_is_null() {
        let resp = RemoteResponse::from_text(204, String::new());
        assert_eq!(resp.body, Value::Null);
        assert!(resp.is_success());
    }

    #[test]
    fn test_error_message_prefers_message_field() {
        let resp = RemoteResponse::new(
            401,
            json!({"message": "jwt expired", "error": "Unauthorized"}),
        );
        assert_eq!(resp.error_message(), "jwt expired");
    }

    #[test]
    fn test_error_message_reads_nested_error() {
        let resp = RemoteResponse::new(500, json!({"error": {"message": "disk full"}}));
        assert_eq!(resp.error_message(), "disk full");
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        let resp = RemoteResponse::new(500, json!({"code": 17}));
        assert_eq!(resp.error_message(), r#"{"code":17}"#);
    }

    #[test]
    fn test_status_predicates() {
        assert!(RemoteResponse::new(401, Value::Null).is_unauthorized());
        assert!(RemoteResponse::new(404, Value::Null).is_not_found());
        assert!(RemoteResponse::new(400, Value::Null).is_not_ready());
        assert!(!RemoteResponse::new(300, Value::Null).is_success());
    }
}
