//! Error types for the switchboard dispatch engine.
//!
//! Most failures in this system are reported in-band as worker replies with
//! a non-zero status; these types cover the out-of-band cases (socket and
//! codec failures, members disappearing mid-call).

use thiserror::Error;

/// Main error type for the dispatch engine.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("socket error: {message}")]
    Socket { message: String },

    #[error("member {group}/{name} is no longer accepting calls")]
    MemberGone { group: String, name: String },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for dispatch-engine operations.
pub type Result<T> = std::result::Result<T, SwitchboardError>;

impl From<std::io::Error> for SwitchboardError {
    fn from(err: std::io::Error) -> Self {
        SwitchboardError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SwitchboardError {
    fn from(err: serde_json::Error) -> Self {
        SwitchboardError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SwitchboardError::MemberGone {
            group: "g".into(),
            name: "w1".into(),
        };
        assert_eq!(err.to_string(), "member g/w1 is no longer accepting calls");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SwitchboardError = parse_err.into();
        assert!(matches!(err, SwitchboardError::Json { .. }));
    }
}
