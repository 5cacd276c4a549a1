use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wekan_scan_catalog::Method;

/// A resolved request: no placeholders left in the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  pub method: Method,
  /// Path relative to the transport's base URL.
  pub path: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<serde_json::Value>,
}

/// A response as seen by the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  #[serde(default)]
  pub headers: HashMap<String, String>,
  /// Parsed JSON body; a non-JSON body is kept as a JSON string and an
  /// empty one is `null`.
  pub body: serde_json::Value,
}

impl Response {
  pub fn new(status: u16, body: serde_json::Value) -> Self {
    Self {
      status,
      headers: HashMap::new(),
      body,
    }
  }

  /// Interpret raw body text the way the transport does.
  pub fn parse_body(text: String) -> serde_json::Value {
    if text.trim().is_empty() {
      return serde_json::Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
  }
}
