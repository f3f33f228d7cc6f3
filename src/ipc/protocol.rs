//! Control-channel wire protocol: newline-delimited JSON over a local
//! stream socket. One request line, one response line.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Maximum bytes accepted for a single request line.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

impl Request {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// String-typed param accessor.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub message: String,
    pub code: String,
    #[serde(default)]
    pub data: Value,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: "OK".to_string(),
            data: Value::Null,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            data,
            ..Self::ok(message)
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
            data: Value::Null,
        }
    }
}

impl From<&Error> for Response {
    fn from(err: &Error) -> Self {
        Response::failure(err.code(), err.to_string())
    }
}

/// Conventional socket location: the user runtime dir when the platform has
/// one, otherwise a per-user name under the temp dir.
pub fn default_socket_path() -> PathBuf {
    if let Some(runtime) = dirs::runtime_dir() {
        return runtime.join("keywarp.sock");
    }
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "shared".to_string());
    std::env::temp_dir().join(format!("keywarp-{user}.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let request = Request::new("action")
            .with_param("name", "hints")
            .with_param("pending", "left-click");
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.str_param("name"), Some("hints"));
        assert_eq!(back.str_param("missing"), None);
    }

    #[test]
    fn request_params_default_to_empty() {
        let request: Request = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert_eq!(request.action, "ping");
        assert!(request.params.is_empty());
    }

    #[test]
    fn response_from_error_carries_the_code() {
        let response = Response::from(&Error::SecureInputEnabled);
        assert!(!response.success);
        assert_eq!(response.code, "SECURE_INPUT");
    }

    #[test]
    fn response_round_trips_with_data() {
        let response = Response::ok_with("status", serde_json::json!({"mode": "idle"}));
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}
