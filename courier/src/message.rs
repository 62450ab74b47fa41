use serde::{Deserialize, Serialize};

use crate::error::{CourierError, Result};
use crate::event::LogEvent;

/// Credentials forwarded to the authentication service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub email: String,
    pub password: String,
}

/// Mail forwarded to the mail service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailPayload {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// Tagged request accepted by the gateway.
///
/// Only the payload selected by `action` is read; the others are ignored and
/// default to empty when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailPayload>,
}

impl RequestEnvelope {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthPayload) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_log(mut self, log: LogEvent) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_mail(mut self, mail: MailPayload) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Decode a request body; anything that is not an envelope is a validation error
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(CourierError::invalid_message)
    }
}

/// `{error, message, data?}` is the gateway's answer to every request, and the
/// body downstream HTTP services answer with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformResponse {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl UniformResponse {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_missing_payloads_default() {
        let envelope = RequestEnvelope::from_bytes(br#"{"action":"foo"}"#).unwrap();
        assert_eq!(envelope.action, "foo");
        assert!(envelope.auth.is_none());
        assert!(envelope.log.is_none());
        assert!(envelope.mail.is_none());
    }

    #[test]
    fn test_envelope_payload_shape() {
        let envelope = RequestEnvelope::from_bytes(
            br#"{"action":"log_rmq","log":{"name":"login","data":"user X"},"auth":{"email":"a@b.com","password":"x"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.log, Some(LogEvent::new("login", "user X")));
        assert_eq!(envelope.auth.unwrap().email, "a@b.com");
    }

    #[test]
    fn test_malformed_envelope_is_validation_error() {
        let err = RequestEnvelope::from_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, CourierError::InvalidMessage { .. }));
        assert!(err.is_validation());

        // action is the one required field
        assert!(RequestEnvelope::from_bytes(br#"{"log":{"name":"a","data":"b"}}"#).is_err());
    }

    #[test]
    fn test_response_omits_empty_data() {
        let json = serde_json::to_value(UniformResponse::failure("unknown action")).unwrap();
        assert_eq!(json, serde_json::json!({"error": true, "message": "unknown action"}));

        let ok = UniformResponse::success("Authenticated", Some(serde_json::json!({"id": 1})));
        assert!(ok.is_success());
        assert_eq!(serde_json::to_value(&ok).unwrap()["data"]["id"], 1);
    }
}
