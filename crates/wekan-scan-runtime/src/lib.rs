//! wekan-scan Runtime
//!
//! Executes a [`Catalog`](wekan_scan_catalog::Catalog) against a
//! [`Transport`](wekan_scan_transport::Transport) and summarizes the outcome.
//!
//! A run is a single sequential pass over the catalog's dependency order:
//! - an endpoint whose requirements did not all succeed is skipped
//! - otherwise its path and body are resolved from earlier results, the
//!   request is sent, and the response is classified
//! - cancellation skips everything not yet sent and still yields a report
//!
//! Progress is reported through a [`Telemetry`] sink as [`ScanEvent`]s.

mod error;
mod events;
mod extract;
mod input;
mod orchestrator;
mod report;
mod result;
mod state;

pub use error::RuntimeError;
pub use events::{ChannelTelemetry, NoopTelemetry, ScanEvent, Telemetry, TracingTelemetry};
pub use extract::extract_fields;
pub use input::{render_body, render_path, resolve_bindings};
pub use orchestrator::{Orchestrator, ScanOptions, classify};
pub use report::{LatencyStats, ScanReport, render_text, summarize, summarize_partial};
pub use result::{CapturedResult, Outcome, Reason};
pub use state::{Counters, ScanState};
