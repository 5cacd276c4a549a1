//! Scan orchestrator.
//!
//! The `Orchestrator` walks a catalog in dependency order, one request at a
//! time, and records exactly one result per endpoint. Endpoint failures never
//! stop the walk; they only cause dependents to be skipped.
//!
//! Cancellation is checked before each request is issued. A request already
//! in flight runs to completion and is classified like any other.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::instrument;
use wekan_scan_catalog::{Catalog, EndpointSpec};
use wekan_scan_transport::{Request, Response, Transport, TransportError};

use crate::error::RuntimeError;
use crate::events::{NoopTelemetry, ScanEvent, Telemetry};
use crate::extract::extract_fields;
use crate::input::{render_body, render_path, resolve_bindings};
use crate::report::{ScanReport, summarize, summarize_partial};
use crate::result::{CapturedResult, Outcome, Reason};
use crate::state::ScanState;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
  /// Emit `request.sent` and `response.received` events.
  pub verbose: bool,
  /// Label for the scanned server, carried into the report.
  pub target: Option<String>,
}

/// Runs scans against a transport.
///
/// Generic over `N: Telemetry` in the same way the transport is generic.
/// Use `Orchestrator::new()` to discard events, or
/// `Orchestrator::with_telemetry()` to observe them.
pub struct Orchestrator<T: Transport, N: Telemetry = NoopTelemetry> {
  transport: T,
  telemetry: N,
  options: ScanOptions,
}

impl<T: Transport> Orchestrator<T, NoopTelemetry> {
  pub fn new(transport: T, options: ScanOptions) -> Self {
    Self::with_telemetry(transport, NoopTelemetry, options)
  }
}

impl<T: Transport, N: Telemetry> Orchestrator<T, N> {
  pub fn with_telemetry(transport: T, telemetry: N, options: ScanOptions) -> Self {
    Self {
      transport,
      telemetry,
      options,
    }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  pub fn telemetry(&self) -> &N {
    &self.telemetry
  }

  /// Scan every endpoint in the catalog.
  ///
  /// Returns a report even when cancelled part way; remaining endpoints are
  /// recorded as skipped and `cancelled` is set. Only a catalog that cannot
  /// be executed as written is an error, and once any result has been
  /// captured that error is [`RuntimeError::Aborted`] carrying the partial
  /// report.
  #[instrument(skip_all, fields(endpoints = catalog.len()))]
  pub async fn run(
    &self,
    catalog: &Catalog,
    cancel: CancellationToken,
  ) -> Result<ScanReport, RuntimeError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut state = ScanState::new(run_id.clone(), catalog).with_target(self.options.target.clone());

    self.telemetry.emit(ScanEvent::ScanStarted {
      run_id: run_id.clone(),
      total: catalog.len(),
      target: self.options.target.clone(),
    });

    let result = match self.run_scan_loop(catalog, &mut state, &cancel).await {
      Ok(()) => summarize(state),
      Err(RuntimeError::Catalog(source)) if !state.results().is_empty() => {
        Err(RuntimeError::Aborted {
          partial: Box::new(summarize_partial(state)),
          source,
        })
      }
      Err(e) => Err(e),
    };

    match &result {
      Ok(report) => {
        self.telemetry.emit(ScanEvent::ScanCompleted {
          report: report.clone(),
        });
      }
      Err(e) => {
        self.telemetry.emit(ScanEvent::ScanAborted {
          run_id,
          error: e.to_string(),
        });
      }
    }

    result
  }

  /// Walk the catalog once, recording one result per endpoint.
  async fn run_scan_loop(
    &self,
    catalog: &Catalog,
    state: &mut ScanState,
    cancel: &CancellationToken,
  ) -> Result<(), RuntimeError> {
    for spec in catalog.specs() {
      let result = if state.is_cancelled() || cancel.is_cancelled() {
        state.mark_cancelled();
        CapturedResult::skipped(spec, Reason::Cancelled)
      } else if let Some(dependency) = unmet_dependency(spec, state) {
        CapturedResult::skipped(spec, Reason::UnmetDependency { dependency })
      } else {
        self.execute_endpoint(spec, state).await?
      };

      self.telemetry.emit(ScanEvent::EndpointAttempted {
        run_id: state.run_id().to_string(),
        result: result.clone(),
      });
      state.record(result)?;
    }

    Ok(())
  }

  /// Resolve inputs, send the request and classify the response.
  async fn execute_endpoint(
    &self,
    spec: &EndpointSpec,
    state: &ScanState,
  ) -> Result<CapturedResult, RuntimeError> {
    let bindings = resolve_bindings(spec, state)?;
    let path = render_path(spec, &bindings)?;
    let body = render_body(spec, &bindings, state.run_id())?;

    let request = Request {
      method: spec.method,
      path,
      body,
    };

    if self.options.verbose {
      self.telemetry.emit(ScanEvent::RequestSent {
        run_id: state.run_id().to_string(),
        endpoint_id: spec.id.clone(),
        method: request.method,
        path: request.path.clone(),
        body: request.body.clone(),
      });
    }

    let start = Instant::now();
    let response = self.transport.send(&request).await;
    let latency = start.elapsed();

    if let (true, Ok(response)) = (self.options.verbose, &response) {
      self.telemetry.emit(ScanEvent::ResponseReceived {
        run_id: state.run_id().to_string(),
        endpoint_id: spec.id.clone(),
        status: response.status,
        latency,
        body: response.body.clone(),
      });
    }

    Ok(classify(spec, request.path, response, latency))
  }
}

/// The first required endpoint that did not succeed, if any.
fn unmet_dependency(spec: &EndpointSpec, state: &ScanState) -> Option<String> {
  spec
    .requires
    .iter()
    .find(|id| state.outcome(id) != Some(Outcome::Success))
    .cloned()
}

/// Classify a transport outcome. Depends only on its inputs.
pub fn classify(
  spec: &EndpointSpec,
  path: String,
  response: Result<Response, TransportError>,
  latency: Duration,
) -> CapturedResult {
  let response = match response {
    Ok(response) => response,
    Err(e) => {
      return CapturedResult::failed(
        spec,
        path,
        None,
        latency,
        Reason::Transport {
          message: e.to_string(),
        },
      );
    }
  };

  if !spec.expect.contains(&response.status) {
    return CapturedResult::failed(
      spec,
      path,
      Some(response.status),
      latency,
      Reason::UnexpectedStatus {
        status: response.status,
      },
    );
  }

  match extract_fields(spec, &response.body) {
    Ok(extracted) => CapturedResult::success(spec, path, response.status, latency, extracted),
    Err(field) => CapturedResult::failed(
      spec,
      path,
      Some(response.status),
      latency,
      Reason::MissingField { field },
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wekan_scan_catalog::Method;

  fn create_board() -> EndpointSpec {
    EndpointSpec::new("create-board", Method::Post, "/api/boards").extract("boardId", "/_id")
  }

  #[test]
  fn test_classify_success() {
    let result = classify(
      &create_board(),
      "/api/boards".into(),
      Ok(Response::new(200, json!({ "_id": "b1" }))),
      Duration::from_millis(3),
    );
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.extracted["boardId"], "b1");
  }

  #[test]
  fn test_classify_unexpected_status() {
    let result = classify(
      &create_board(),
      "/api/boards".into(),
      Ok(Response::new(500, json!({ "_id": "b1" }))),
      Duration::ZERO,
    );
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.status_code, Some(500));
    assert_eq!(result.reason, Some(Reason::UnexpectedStatus { status: 500 }));
    assert!(result.extracted.is_empty());
  }

  #[test]
  fn test_classify_missing_field_keeps_status() {
    let result = classify(
      &create_board(),
      "/api/boards".into(),
      Ok(Response::new(200, json!({}))),
      Duration::ZERO,
    );
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.status_code, Some(200));
    assert_eq!(
      result.reason,
      Some(Reason::MissingField {
        field: "boardId".into()
      })
    );
  }

  #[test]
  fn test_classify_transport_error() {
    let result = classify(
      &create_board(),
      "/api/boards".into(),
      Err(TransportError::Timeout {
        method: "POST".into(),
        path: "/api/boards".into(),
      }),
      Duration::from_secs(30),
    );
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.status_code, None);
    assert!(matches!(result.reason, Some(Reason::Transport { .. })));
  }

  #[test]
  fn test_classify_is_deterministic() {
    let response = || Ok(Response::new(201, json!({ "_id": "b1" })));
    let spec = create_board().expect([200, 201]);
    let a = classify(&spec, "/api/boards".into(), response(), Duration::ZERO);
    let b = classify(&spec, "/api/boards".into(), response(), Duration::ZERO);
    assert_eq!(a, b);
  }
}
