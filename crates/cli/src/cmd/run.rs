//! Implementation of the `tensorseal-factory run` command.

use std::time::Instant;

use anyhow::{Context, Result};
use tensorseal_lib::config::ConfigOverrides;
use tensorseal_lib::pipeline::{Pipeline, PipelineReport};
use tensorseal_lib::publish::GcsClient;
use tracing::info;

use super::{Failure, load_config};
use crate::output::{
  OutputFormat, Progress, format_bytes, format_duration, print_info, print_json, print_stat, print_success,
  truncate_hash,
};

/// Runs the whole factory pipeline once.
///
/// Configuration is validated before anything touches the filesystem. A run
/// without a bucket succeeds with the upload skipped; any stage failure is
/// returned as an error so the process exits non-zero.
pub fn cmd_run(overrides: &ConfigOverrides, format: OutputFormat, verbose: bool) -> Result<()> {
  let config = load_config(overrides, format)?;
  let store = GcsClient::from_env();
  let pipeline = Pipeline::new(&config, &store);

  if !format.is_json() {
    print_info(&format!(
      "Building for user {} in {}",
      config.user_id,
      config.root.display()
    ));
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let result = if format.is_json() {
    rt.block_on(pipeline.run(&mut ()))
  } else {
    rt.block_on(pipeline.run(&mut Progress))
  };
  let elapsed = started.elapsed();
  info!(elapsed = ?elapsed, ok = result.is_ok(), "run finished");

  match result {
    Ok(report) => {
      if format.is_json() {
        print_json(&report)?;
      } else {
        print_report(&report, verbose);
        print_stat("Elapsed", &format_duration(elapsed));
      }
      Ok(())
    }
    Err(err) => {
      if format.is_json() {
        print_json(&Failure::new(err.stage.label(), err.source.to_string()))?;
      }
      Err(err).context("Factory run failed")
    }
  }
}

fn print_report(report: &PipelineReport, verbose: bool) {
  println!();
  print_success("Factory run complete");
  print_stat("User", report.user_id.as_str());
  print_stat("Archive", &report.archive.path.display().to_string());
  print_stat("Size", &format_bytes(report.archive.size));

  let hash = &report.archive.sha256.0;
  print_stat("SHA-256", if verbose { hash } else { truncate_hash(hash) });

  match &report.remote {
    Some(remote) => print_stat("Uploaded", &format!("gs://{}/{}", remote.bucket, remote.key)),
    None => print_stat("Uploaded", "no (BUCKET_NAME not set)"),
  }
}
