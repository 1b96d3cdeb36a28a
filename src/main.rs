//! # Paper Audit CLI
//!
//! Audits one or many newspaper websites and prints the results as JSON, or
//! writes one JSON file per site.
//!
//! ## Usage
//!
//! ```sh
//! paper_audit example-gazette.com
//! paper_audit --input papers.txt -j ./audits
//! ```
//!
//! Audits of different sites run concurrently (`--concurrency`, default 4);
//! each audit is sequential and keeps its own politeness throttle.

use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use paper_audit::outputs::json;
use paper_audit::utils::{ensure_writable_dir, read_url_list};
use paper_audit::{AuditConfig, AuditResult, Auditor, HttpTransport};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("paper_audit starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    // ---- Targets ----
    let mut targets = args.urls.clone();
    if let Some(path) = &args.input {
        targets.extend(read_url_list(path).await?);
    }
    if targets.is_empty() {
        error!("No targets given; pass URLs or --input");
        return Err("no targets to audit".into());
    }

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Audit targets concurrently ----
    let transport = HttpTransport::new()?;
    let concurrency = config.concurrency;
    let config = Arc::new(config);
    let total = targets.len();
    info!(total, concurrency, strict = config.strict_timeouts, "Starting audits");

    let results: Vec<(usize, AuditResult)> = stream::iter(targets.iter().enumerate())
        .map(|(i, target)| {
            let transport = transport.clone();
            let config = Arc::clone(&config);
            async move {
                let auditor = Auditor::with_transport(transport, (*config).clone());
                match auditor.audit(target).await {
                    Ok(result) => Some((i, result)),
                    Err(e) => {
                        error!(index = i, target = %target, error = %e, "Audit failed; skipping target");
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .filter_map(|r| async move { r })
        .collect()
        .await;

    let results: Vec<AuditResult> = results
        .into_iter()
        .sorted_by_key(|(i, _)| *i)
        .map(|(_, r)| r)
        .collect();

    let failed = total - results.len();
    let pdf_only = results.iter().filter(|r| r.pdf_only.is_yes()).count();
    info!(total, succeeded = results.len(), failed, pdf_only, "Completed audits");

    // ---- Output ----
    match &args.json_output_dir {
        Some(dir) => {
            for result in &results {
                if let Err(e) = json::write_audit(result, dir).await {
                    warn!(url = %result.url, error = %e, "Failed to write audit JSON");
                }
            }
        }
        None => println!("{}", json::render_results(&results)?),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
