//! Scan events and telemetry sinks.
//!
//! The orchestrator emits one event per step so callers can print progress,
//! stream results, or record them for tests without the runtime knowing
//! which.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use wekan_scan_catalog::Method;

use crate::report::ScanReport;
use crate::result::{CapturedResult, Outcome};

/// Events emitted during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanEvent {
  /// The scan is about to walk the catalog.
  ScanStarted {
    run_id: String,
    total: usize,
    target: Option<String>,
  },

  /// A request is about to be sent. Verbose runs only.
  RequestSent {
    run_id: String,
    endpoint_id: String,
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
  },

  /// A response came back. Verbose runs only.
  ResponseReceived {
    run_id: String,
    endpoint_id: String,
    status: u16,
    #[serde(with = "crate::result::millis")]
    latency: Duration,
    body: serde_json::Value,
  },

  /// A result was recorded for an endpoint, skipped ones included.
  EndpointAttempted {
    run_id: String,
    result: CapturedResult,
  },

  /// The scan finished, possibly cancelled part way.
  ScanCompleted { report: ScanReport },

  /// The scan hit a fatal error and produced no report.
  ScanAborted { run_id: String, error: String },
}

impl ScanEvent {
  /// Dotted event name, e.g. `endpoint.attempted`.
  pub fn name(&self) -> &'static str {
    match self {
      ScanEvent::ScanStarted { .. } => "scan.started",
      ScanEvent::RequestSent { .. } => "request.sent",
      ScanEvent::ResponseReceived { .. } => "response.received",
      ScanEvent::EndpointAttempted { .. } => "endpoint.attempted",
      ScanEvent::ScanCompleted { .. } => "scan.completed",
      ScanEvent::ScanAborted { .. } => "scan.aborted",
    }
  }

  pub fn run_id(&self) -> &str {
    match self {
      ScanEvent::ScanStarted { run_id, .. }
      | ScanEvent::RequestSent { run_id, .. }
      | ScanEvent::ResponseReceived { run_id, .. }
      | ScanEvent::EndpointAttempted { run_id, .. }
      | ScanEvent::ScanAborted { run_id, .. } => run_id,
      ScanEvent::ScanCompleted { report } => &report.run_id,
    }
  }

  /// Flat key/value view of the event for structured sinks.
  ///
  /// `scan.completed` carries the summary only, not every result.
  pub fn fields(&self) -> serde_json::Map<String, serde_json::Value> {
    let value = match self {
      ScanEvent::ScanStarted {
        run_id,
        total,
        target,
      } => json!({ "run_id": run_id, "total": total, "target": target }),
      ScanEvent::RequestSent {
        run_id,
        endpoint_id,
        method,
        path,
        body,
      } => json!({
        "run_id": run_id,
        "endpoint_id": endpoint_id,
        "method": method,
        "path": path,
        "body": body,
      }),
      ScanEvent::ResponseReceived {
        run_id,
        endpoint_id,
        status,
        latency,
        body,
      } => json!({
        "run_id": run_id,
        "endpoint_id": endpoint_id,
        "status": status,
        "latency_ms": latency.as_millis() as u64,
        "body": body,
      }),
      ScanEvent::EndpointAttempted { run_id, result } => json!({
        "run_id": run_id,
        "endpoint_id": result.endpoint_id,
        "category": result.category,
        "method": result.method,
        "path": result.path,
        "outcome": result.outcome,
        "status_code": result.status_code,
        "latency_ms": result.latency.as_millis() as u64,
        "reason": result.reason.as_ref().map(ToString::to_string),
      }),
      ScanEvent::ScanCompleted { report } => json!({
        "run_id": report.run_id,
        "total": report.total,
        "succeeded": report.counts.succeeded,
        "failed": report.counts.failed,
        "skipped": report.counts.skipped,
        "cancelled": report.cancelled,
      }),
      ScanEvent::ScanAborted { run_id, error } => json!({ "run_id": run_id, "error": error }),
    };

    match value {
      serde_json::Value::Object(map) => map,
      _ => serde_json::Map::new(),
    }
  }
}

/// Receives scan events.
///
/// The orchestrator calls `emit` inline for every event; implementations
/// should not block.
pub trait Telemetry: Send + Sync {
  fn emit(&self, event: ScanEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
  fn emit(&self, _event: ScanEvent) {}
}

/// Sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
  // Unbounded so a slow consumer never stalls the scan; volume is a handful
  // of events per endpoint.
  sender: mpsc::UnboundedSender<ScanEvent>,
}

impl ChannelTelemetry {
  pub fn new(sender: mpsc::UnboundedSender<ScanEvent>) -> Self {
    Self { sender }
  }
}

impl Telemetry for ChannelTelemetry {
  fn emit(&self, event: ScanEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// Writes events as structured `tracing` records.
#[derive(Debug, Clone, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
  fn emit(&self, event: ScanEvent) {
    match &event {
      ScanEvent::ScanStarted {
        run_id,
        total,
        target,
      } => {
        tracing::info!(run_id = %run_id, total, target = ?target, "scan_started");
      }
      ScanEvent::RequestSent {
        endpoint_id,
        method,
        path,
        body,
        ..
      } => {
        tracing::debug!(
          endpoint_id = %endpoint_id,
          method = %method,
          path = %path,
          body = ?body,
          "request_sent"
        );
      }
      ScanEvent::ResponseReceived {
        endpoint_id,
        status,
        latency,
        body,
        ..
      } => {
        tracing::debug!(
          endpoint_id = %endpoint_id,
          status,
          latency_ms = latency.as_millis() as u64,
          body = %body,
          "response_received"
        );
      }
      ScanEvent::EndpointAttempted { result, .. } => {
        let reason = result.reason.as_ref().map(ToString::to_string);
        match result.outcome {
          Outcome::Failed => tracing::warn!(
            endpoint_id = %result.endpoint_id,
            outcome = %result.outcome,
            status = ?result.status_code,
            latency_ms = result.latency.as_millis() as u64,
            reason = ?reason,
            "endpoint_attempted"
          ),
          _ => tracing::info!(
            endpoint_id = %result.endpoint_id,
            outcome = %result.outcome,
            status = ?result.status_code,
            latency_ms = result.latency.as_millis() as u64,
            reason = ?reason,
            "endpoint_attempted"
          ),
        }
      }
      ScanEvent::ScanCompleted { report } => {
        tracing::info!(
          run_id = %report.run_id,
          total = report.total,
          succeeded = report.counts.succeeded,
          failed = report.counts.failed,
          skipped = report.counts.skipped,
          cancelled = report.cancelled,
          "scan_completed"
        );
      }
      ScanEvent::ScanAborted { run_id, error } => {
        tracing::error!(run_id = %run_id, error = %error, "scan_aborted");
      }
    }
  }
}
