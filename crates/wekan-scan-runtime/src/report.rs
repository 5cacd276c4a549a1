//! Scan report aggregation and rendering.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;
use crate::result::{CapturedResult, Outcome, millis};
use crate::state::{Counters, ScanState};

/// Latency over endpoints that made a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
  pub count: usize,
  #[serde(rename = "total_ms", with = "millis")]
  pub total: Duration,
  #[serde(rename = "min_ms", with = "millis")]
  pub min: Duration,
  #[serde(rename = "median_ms", with = "millis")]
  pub median: Duration,
  #[serde(rename = "max_ms", with = "millis")]
  pub max: Duration,
}

impl LatencyStats {
  /// Stats over the given samples, or `None` when there are none.
  ///
  /// The median of an even sample count is the mean of the middle two.
  pub fn from_samples(samples: impl IntoIterator<Item = Duration>) -> Option<Self> {
    let mut samples: Vec<Duration> = samples.into_iter().collect();
    if samples.is_empty() {
      return None;
    }
    samples.sort();

    let count = samples.len();
    let mid = count / 2;
    let median = if count % 2 == 0 {
      (samples[mid - 1] + samples[mid]) / 2
    } else {
      samples[mid]
    };

    Some(Self {
      count,
      total: samples.iter().sum(),
      min: samples[0],
      median,
      max: samples[count - 1],
    })
  }
}

/// Final summary of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
  pub run_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target: Option<String>,
  pub total: usize,
  pub counts: Counters,
  pub categories: BTreeMap<String, Counters>,
  pub latency: Option<LatencyStats>,
  pub cancelled: bool,
  /// A fatal error stopped the run; `results` covers only the endpoints
  /// reached before it.
  #[serde(default)]
  pub aborted: bool,
  /// Results in execution order.
  pub results: Vec<CapturedResult>,
}

impl ScanReport {
  pub fn get(&self, endpoint_id: &str) -> Option<&CapturedResult> {
    self.results.iter().find(|r| r.endpoint_id == endpoint_id)
  }

  pub fn outcome(&self, endpoint_id: &str) -> Option<Outcome> {
    self.get(endpoint_id).map(|r| r.outcome)
  }

  /// Outcomes in execution order.
  pub fn outcomes(&self) -> Vec<Outcome> {
    self.results.iter().map(|r| r.outcome).collect()
  }
}

/// Turn a finished scan state into a report.
///
/// Fails if the results do not cover the catalog exactly once.
pub fn summarize(state: ScanState) -> Result<ScanReport, RuntimeError> {
  let expected: HashSet<&str> = state.expected.iter().map(String::as_str).collect();
  let mut seen = HashSet::with_capacity(state.results.len());

  for result in &state.results {
    if !expected.contains(result.endpoint_id.as_str()) {
      return Err(RuntimeError::InconsistentState {
        message: format!("result for unknown endpoint '{}'", result.endpoint_id),
      });
    }
    if !seen.insert(result.endpoint_id.as_str()) {
      return Err(RuntimeError::DuplicateResult {
        endpoint_id: result.endpoint_id.clone(),
      });
    }
  }

  let missing: Vec<&str> = state
    .expected
    .iter()
    .map(String::as_str)
    .filter(|id| !seen.contains(id))
    .collect();
  if !missing.is_empty() {
    return Err(RuntimeError::InconsistentState {
      message: format!("no result for endpoints: {}", missing.join(", ")),
    });
  }

  Ok(build_report(state, false))
}

/// Report on whatever a run captured before a fatal error.
///
/// No coverage check: endpoints after the failure have no result.
pub fn summarize_partial(state: ScanState) -> ScanReport {
  build_report(state, true)
}

fn build_report(state: ScanState, aborted: bool) -> ScanReport {
  let counts = state.counters();
  let mut categories: BTreeMap<String, Counters> = BTreeMap::new();
  for result in &state.results {
    categories
      .entry(result.category.clone())
      .or_default()
      .count(result.outcome);
  }

  let latency = LatencyStats::from_samples(
    state
      .results
      .iter()
      .filter(|r| r.was_attempted())
      .map(|r| r.latency),
  );

  ScanReport {
    run_id: state.run_id,
    target: state.target,
    total: state.expected.len(),
    counts,
    categories,
    latency,
    cancelled: state.cancelled,
    aborted,
    results: state.results,
  }
}

/// Render a report as a plain-text table.
pub fn render_text(report: &ScanReport) -> String {
  TextReport(report).to_string()
}

struct TextReport<'a>(&'a ScanReport);

impl fmt::Display for TextReport<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let report = self.0;
    let width = report
      .results
      .iter()
      .map(|r| r.endpoint_id.len())
      .max()
      .unwrap_or(0)
      .max("ENDPOINT".len());

    writeln!(f, "Scan {}", report.run_id)?;
    if let Some(target) = &report.target {
      writeln!(f, "Target: {}", target)?;
    }
    if report.aborted {
      writeln!(
        f,
        "Status: aborted after {} of {} endpoints",
        report.results.len(),
        report.total
      )?;
    } else if report.cancelled {
      writeln!(f, "Status: cancelled")?;
    }
    writeln!(f)?;

    writeln!(
      f,
      "{:<width$}  {:<6}  {:<6}  {:<7}  {:>8}  DETAIL",
      "ENDPOINT", "METHOD", "STATUS", "OUTCOME", "LATENCY"
    )?;
    for r in &report.results {
      let status = r.status_code.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
      let latency = if r.was_attempted() {
        format!("{}ms", r.latency.as_millis())
      } else {
        "-".to_string()
      };
      let detail = r.reason.as_ref().map(ToString::to_string).unwrap_or_default();
      writeln!(
        f,
        "{:<width$}  {:<6}  {:<6}  {:<7}  {:>8}  {}",
        r.endpoint_id,
        r.method.as_str(),
        status,
        r.outcome.as_str(),
        latency,
        detail
      )?;
    }
    writeln!(f)?;

    let c = &report.counts;
    writeln!(
      f,
      "Endpoints: {} total, {} attempted, {} succeeded, {} failed, {} skipped",
      report.total, c.attempted, c.succeeded, c.failed, c.skipped
    )?;
    match &report.latency {
      Some(l) => writeln!(
        f,
        "Latency: min {}ms, median {}ms, max {}ms, total {}ms over {} calls",
        l.min.as_millis(),
        l.median.as_millis(),
        l.max.as_millis(),
        l.total.as_millis(),
        l.count
      )?,
      None => writeln!(f, "Latency: no calls made")?,
    }

    if !report.categories.is_empty() {
      writeln!(f, "By category:")?;
      for (category, c) in &report.categories {
        writeln!(
          f,
          "  {:<14} {} succeeded, {} failed, {} skipped",
          category, c.succeeded, c.failed, c.skipped
        )?;
      }
    }
    Ok(())
  }
}
