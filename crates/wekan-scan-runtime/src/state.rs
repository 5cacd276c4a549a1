//! Mutable state of a single scan run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wekan_scan_catalog::Catalog;

use crate::error::RuntimeError;
use crate::result::{CapturedResult, Outcome};

/// Running totals for a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
  /// Endpoints for which a transport call was made.
  pub attempted: usize,
  pub succeeded: usize,
  pub failed: usize,
  pub skipped: usize,
}

impl Counters {
  pub(crate) fn count(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::Success => {
        self.attempted += 1;
        self.succeeded += 1;
      }
      Outcome::Failed => {
        self.attempted += 1;
        self.failed += 1;
      }
      Outcome::Skipped => self.skipped += 1,
    }
  }
}

/// Results captured so far in one run, keyed by endpoint id.
///
/// Owned by the orchestrator while the scan runs, then handed to
/// [`summarize`](crate::summarize) by value.
#[derive(Debug, Clone)]
pub struct ScanState {
  pub(crate) run_id: String,
  pub(crate) target: Option<String>,
  pub(crate) expected: Vec<String>,
  pub(crate) results: Vec<CapturedResult>,
  index: HashMap<String, usize>,
  counters: Counters,
  pub(crate) cancelled: bool,
}

impl ScanState {
  pub fn new(run_id: impl Into<String>, catalog: &Catalog) -> Self {
    Self {
      run_id: run_id.into(),
      target: None,
      expected: catalog.ids().map(str::to_string).collect(),
      results: Vec::with_capacity(catalog.len()),
      index: HashMap::with_capacity(catalog.len()),
      counters: Counters::default(),
      cancelled: false,
    }
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Label for the scanned server, usually its base URL.
  pub fn with_target(mut self, target: Option<String>) -> Self {
    self.target = target;
    self
  }

  pub fn target(&self) -> Option<&str> {
    self.target.as_deref()
  }

  /// Endpoint ids the catalog expects a result for, in scan order.
  pub fn expected(&self) -> &[String] {
    &self.expected
  }

  /// Record a result. Each endpoint may be recorded once.
  pub fn record(&mut self, result: CapturedResult) -> Result<(), RuntimeError> {
    if self.index.contains_key(&result.endpoint_id) {
      return Err(RuntimeError::DuplicateResult {
        endpoint_id: result.endpoint_id,
      });
    }
    self.counters.count(result.outcome);
    self
      .index
      .insert(result.endpoint_id.clone(), self.results.len());
    self.results.push(result);
    Ok(())
  }

  pub fn get(&self, endpoint_id: &str) -> Option<&CapturedResult> {
    self.index.get(endpoint_id).map(|&i| &self.results[i])
  }

  pub fn outcome(&self, endpoint_id: &str) -> Option<Outcome> {
    self.get(endpoint_id).map(|r| r.outcome)
  }

  /// Results in execution order.
  pub fn results(&self) -> &[CapturedResult] {
    &self.results
  }

  pub fn counters(&self) -> Counters {
    self.counters
  }

  pub fn mark_cancelled(&mut self) {
    self.cancelled = true;
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::result::Reason;
  use wekan_scan_catalog::{EndpointSpec, Method};

  fn catalog() -> Catalog {
    Catalog::new(vec![
      EndpointSpec::new("a", Method::Get, "/a"),
      EndpointSpec::new("b", Method::Get, "/b").requires("a"),
    ])
    .unwrap()
  }

  #[test]
  fn test_record_and_count() {
    let catalog = catalog();
    let mut state = ScanState::new("run-1", &catalog);

    let a = catalog.get("a").unwrap();
    let b = catalog.get("b").unwrap();
    state
      .record(CapturedResult::failed(
        a,
        "/a".into(),
        Some(500),
        Default::default(),
        Reason::UnexpectedStatus { status: 500 },
      ))
      .unwrap();
    state
      .record(CapturedResult::skipped(
        b,
        Reason::UnmetDependency {
          dependency: "a".into(),
        },
      ))
      .unwrap();

    assert_eq!(state.expected(), ["a", "b"]);
    assert_eq!(state.outcome("a"), Some(Outcome::Failed));
    assert_eq!(state.outcome("b"), Some(Outcome::Skipped));
    assert_eq!(
      state.counters(),
      Counters {
        attempted: 1,
        succeeded: 0,
        failed: 1,
        skipped: 1,
      }
    );
  }

  #[test]
  fn test_duplicate_record_rejected() {
    let catalog = catalog();
    let mut state = ScanState::new("run-1", &catalog);
    let a = catalog.get("a").unwrap();

    state
      .record(CapturedResult::skipped(a, Reason::Cancelled))
      .unwrap();
    let err = state
      .record(CapturedResult::skipped(a, Reason::Cancelled))
      .unwrap_err();

    assert!(matches!(err, RuntimeError::DuplicateResult { .. }));
    assert_eq!(state.results().len(), 1);
  }
}
