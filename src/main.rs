use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wekan_scan_catalog::Catalog;
use wekan_scan_runtime::{
  Orchestrator, RuntimeError, ScanOptions, ScanReport, TracingTelemetry, render_text,
};
use wekan_scan_transport::{HttpTransport, TransportConfig};

/// Exit status for a scan interrupted by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

/// wekan-scan - Walk a Wekan server's REST API in dependency order
#[derive(Parser)]
#[command(name = "wekan-scan")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Base URL of the Wekan server (required with --all)
  #[arg(long, short = 'u', env = "WEKAN_URL")]
  url: Option<String>,

  /// Scan every endpoint in the catalog
  #[arg(long)]
  all: bool,

  /// Log every request and response
  #[arg(long, short = 'v')]
  verbose: bool,

  /// API token sent as a bearer token
  #[arg(long, env = "WEKAN_API_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Disable TLS certificate verification
  #[arg(long)]
  no_verify_ssl: bool,

  /// Per-request timeout in seconds
  #[arg(long, default_value_t = 30)]
  timeout_secs: u64,

  /// Load the catalog from a JSON file instead of the built-in Wekan catalog
  #[arg(long)]
  catalog: Option<PathBuf>,

  /// Print the report as JSON
  #[arg(long)]
  json: bool,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(code) => code,
    Err(e) => {
      eprintln!("Error: {:#}", e);
      ExitCode::FAILURE
    }
  }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
  let catalog = load_catalog(cli.catalog.as_ref())?;

  if !cli.all {
    print_catalog(&catalog);
    return Ok(ExitCode::SUCCESS);
  }

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { scan_async(cli, catalog).await })
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog> {
  match path {
    Some(path) => Catalog::from_path(path)
      .with_context(|| format!("failed to load catalog: {}", path.display())),
    None => Catalog::wekan().context("built-in catalog is invalid"),
  }
}

async fn scan_async(cli: Cli, catalog: Catalog) -> Result<ExitCode> {
  let Some(url) = cli.url else {
    bail!("--url is required (or set WEKAN_URL)");
  };

  let config = TransportConfig {
    base_url: url.clone(),
    token: cli.token,
    timeout: Duration::from_secs(cli.timeout_secs),
    verify_tls: !cli.no_verify_ssl,
  };
  let transport = HttpTransport::new(config).context("failed to create http transport")?;

  let options = ScanOptions {
    verbose: cli.verbose,
    target: Some(url),
  };
  let orchestrator = Orchestrator::with_telemetry(transport, TracingTelemetry, options);

  let cancel = CancellationToken::new();
  let interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Interrupted, skipping remaining endpoints");
      interrupt.cancel();
    }
  });

  eprintln!("Scanning {} endpoints", catalog.len());

  let report = match orchestrator.run(&catalog, cancel).await {
    Ok(report) => report,
    Err(RuntimeError::Aborted { partial, source }) => {
      print_report(&partial, cli.json)?;
      return Err(anyhow::Error::new(source).context("scan aborted"));
    }
    Err(e) => return Err(anyhow::Error::new(e).context("scan aborted")),
  };

  print_report(&report, cli.json)?;

  if report.cancelled {
    Ok(ExitCode::from(EXIT_CANCELLED))
  } else {
    Ok(ExitCode::SUCCESS)
  }
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(report)?);
  } else {
    print!("{}", render_text(report));
  }
  Ok(())
}

fn print_catalog(catalog: &Catalog) {
  println!("{} endpoints in scan order:", catalog.len());
  for spec in catalog.specs() {
    println!(
      "  {:<24} {:<14} {:<6} {}",
      spec.id,
      spec.category,
      spec.method.as_str(),
      spec.path
    );
  }
  println!("\nRun with --all to scan them.");
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn test_cli_definition() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_url_help_says_it_is_needed_to_scan() {
    let command = Cli::command();
    let url = command
      .get_arguments()
      .find(|a| a.get_id() == "url")
      .unwrap();
    let help = url.get_help().unwrap().to_string();
    assert!(help.contains("required with --all"), "{}", help);
  }

  #[test]
  fn test_scan_without_url_is_an_error() {
    let cli = Cli::try_parse_from(["wekan-scan", "--all"]).unwrap();
    if cli.url.is_some() {
      // WEKAN_URL is set in this environment
      return;
    }
    let catalog = Catalog::wekan().unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(scan_async(cli, catalog)).unwrap_err();
    assert!(err.to_string().contains("--url is required"));
  }
}
