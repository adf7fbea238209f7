//! Wire types shared with workers.
//!
//! Outbound socket frames are JSON arrays of [`CallRequest`]; inbound frames
//! are JSON arrays of [`CallReply`]. A frame never carries more than the
//! writer's batch bound of requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved action name used by the `/exec` endpoint for code evaluation.
pub const EXEC_ACTION: &str = "_execjs";

/// One outbound call to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub id: String,
    pub action: String,
    pub param: String,
}

/// One worker reply. `status` zero means success; anything else is a
/// worker-reported failure. Absent fields decode to their defaults so
/// sloppy workers still correlate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReply {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: String,
}

impl CallReply {
    /// Canned failure reply with no correlation id.
    pub fn failure(msg: &str) -> Self {
        Self {
            id: String::new(),
            status: 1,
            data: Value::Null,
            msg: msg.to_owned(),
        }
    }

    /// Reply sent when no member matches the caller's selector.
    pub fn no_such_connection() -> Self {
        Self::failure("no such connection")
    }

    /// Reply sent when the call deadline elapses.
    pub fn timed_out() -> Self {
        Self::failure("timeout")
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// One row of the `/list` endpoint, keyed by group and member name.
#[derive(Debug, Serialize)]
pub struct MemberStatus {
    pub status: &'static str,
    #[serde(rename = "sendNumber")]
    pub send_number: u64,
    pub waiting: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let req = CallRequest {
            id: "7".into(),
            action: "ping".into(),
            param: "x".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"id":"7","action":"ping","param":"x"}"#);
    }

    #[test]
    fn test_reply_defaults_on_missing_fields() {
        let reply: CallReply = serde_json::from_str(r#"{"id":"3"}"#).unwrap();
        assert_eq!(reply.id, "3");
        assert_eq!(reply.status, 0);
        assert_eq!(reply.data, Value::Null);
        assert_eq!(reply.msg, "");
    }

    #[test]
    fn test_canned_failure_bodies() {
        assert_eq!(
            serde_json::to_string(&CallReply::no_such_connection()).unwrap(),
            r#"{"id":"","status":1,"data":null,"msg":"no such connection"}"#
        );
        assert_eq!(
            serde_json::to_string(&CallReply::timed_out()).unwrap(),
            r#"{"id":"","status":1,"data":null,"msg":"timeout"}"#
        );
    }

    #[test]
    fn test_member_status_rename() {
        let row = MemberStatus {
            status: "ok",
            send_number: 4,
            waiting: 1,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"status":"ok","sendNumber":4,"waiting":1}"#);
    }
}
