//! Runtime error types.

use wekan_scan_catalog::CatalogError;

use crate::report::ScanReport;

/// Errors that abort a scan.
///
/// Endpoint failures are not errors; they are recorded in the report. Only
/// an inconsistent catalog or broken internal bookkeeping ends up here.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// The catalog cannot be executed as written.
  #[error(transparent)]
  Catalog(#[from] CatalogError),

  /// The catalog failed part way through a run. Results captured before the
  /// failure are kept in `partial`.
  #[error(
    "scan aborted after {} of {} endpoints: {source}",
    .partial.results.len(),
    .partial.total
  )]
  Aborted {
    partial: Box<ScanReport>,
    #[source]
    source: CatalogError,
  },

  /// A second result was recorded for the same endpoint.
  #[error("duplicate result for endpoint '{endpoint_id}'")]
  DuplicateResult { endpoint_id: String },

  /// The finished scan state does not line up with the catalog.
  #[error("inconsistent scan state: {message}")]
  InconsistentState { message: String },
}
