//! Per-endpoint scan results.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wekan_scan_catalog::{EndpointSpec, Method};

/// Classification of one endpoint attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Success,
  Failed,
  Skipped,
}

impl Outcome {
  pub fn as_str(&self) -> &'static str {
    match self {
      Outcome::Success => "success",
      Outcome::Failed => "failed",
      Outcome::Skipped => "skipped",
    }
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why an endpoint did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
  /// A required endpoint failed or was skipped.
  UnmetDependency { dependency: String },
  /// The scan was cancelled before this endpoint ran.
  Cancelled,
  /// No response was received.
  Transport { message: String },
  /// A response arrived with a status outside the expected set.
  UnexpectedStatus { status: u16 },
  /// The status was expected but a declared field was absent from the body.
  MissingField { field: String },
}

impl fmt::Display for Reason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Reason::UnmetDependency { dependency } => write!(f, "unmet dependency: {}", dependency),
      Reason::Cancelled => f.write_str("cancelled"),
      Reason::Transport { message } => write!(f, "transport error: {}", message),
      Reason::UnexpectedStatus { status } => write!(f, "unexpected status {}", status),
      Reason::MissingField { field } => write!(f, "missing field '{}' in response", field),
    }
  }
}

/// Serialize a `Duration` as whole milliseconds.
pub(crate) mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
  }
}

/// The recorded outcome of attempting one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResult {
  pub endpoint_id: String,
  pub category: String,
  pub method: Method,
  /// Resolved request path, or the template when the endpoint never ran.
  pub path: String,
  pub outcome: Outcome,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
  /// Wall-clock time around the transport call; zero when skipped.
  #[serde(rename = "latency_ms", with = "millis")]
  pub latency: Duration,
  /// Fields pulled from the response body; only populated on success.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub extracted: BTreeMap<String, serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<Reason>,
}

impl CapturedResult {
  pub fn success(
    spec: &EndpointSpec,
    path: String,
    status: u16,
    latency: Duration,
    extracted: BTreeMap<String, serde_json::Value>,
  ) -> Self {
    Self {
      endpoint_id: spec.id.clone(),
      category: spec.category.clone(),
      method: spec.method,
      path,
      outcome: Outcome::Success,
      status_code: Some(status),
      latency,
      extracted,
      reason: None,
    }
  }

  pub fn failed(
    spec: &EndpointSpec,
    path: String,
    status: Option<u16>,
    latency: Duration,
    reason: Reason,
  ) -> Self {
    Self {
      endpoint_id: spec.id.clone(),
      category: spec.category.clone(),
      method: spec.method,
      path,
      outcome: Outcome::Failed,
      status_code: status,
      latency,
      extracted: BTreeMap::new(),
      reason: Some(reason),
    }
  }

  pub fn skipped(spec: &EndpointSpec, reason: Reason) -> Self {
    Self {
      endpoint_id: spec.id.clone(),
      category: spec.category.clone(),
      method: spec.method,
      path: spec.path.clone(),
      outcome: Outcome::Skipped,
      status_code: None,
      latency: Duration::ZERO,
      extracted: BTreeMap::new(),
      reason: Some(reason),
    }
  }

  /// Whether a transport call was made for this endpoint.
  pub fn was_attempted(&self) -> bool {
    self.outcome != Outcome::Skipped
  }
}
