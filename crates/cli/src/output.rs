//! CLI output formatting utilities.
//!
//! Progress lines carry a `[factory:<stage>]` prefix so they can be told
//! apart from toolchain output interleaved on the same terminal.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use tensorseal_lib::pipeline::{PipelineObserver, Stage, StageError};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

pub const CONFIG_PREFIX: &str = "[factory:config]";

pub fn stage_prefix(stage: Stage) -> String {
  format!("[factory:{}]", stage.label())
}

pub fn print_stage_info(stage: Stage, message: &str) {
  println!(
    "{} {} {}",
    stage_prefix(stage).if_supports_color(Stream::Stdout, |s| s.dimmed()),
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stage_success(stage: Stage, message: &str) {
  println!(
    "{} {} {}",
    stage_prefix(stage).if_supports_color(Stream::Stdout, |s| s.dimmed()),
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_stage_warning(stage: Stage, message: &str) {
  println!(
    "{} {} {}",
    stage_prefix(stage).if_supports_color(Stream::Stdout, |s| s.dimmed()),
    symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow()),
    message.if_supports_color(Stream::Stdout, |s| s.yellow())
  );
}

pub fn print_stage_error(stage: Stage, message: &str) {
  print_prefixed_error(&stage_prefix(stage), message);
}

/// Configuration is checked before any stage runs, so its failures get their
/// own prefix.
pub fn print_config_error(message: &str) {
  print_prefixed_error(CONFIG_PREFIX, message);
}

fn print_prefixed_error(prefix: &str, message: &str) {
  println!(
    "{} {} {}",
    prefix.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
    message.if_supports_color(Stream::Stdout, |s| s.red())
  );
}

fn stage_activity(stage: Stage) -> &'static str {
  match stage {
    Stage::InjectKey => "sealing placeholder model",
    Stage::Build => "building release library",
    Stage::Package => "packaging artifacts",
    Stage::Publish => "publishing archive",
  }
}

/// Prints pipeline progress to the terminal.
#[derive(Debug, Default)]
pub struct Progress;

impl PipelineObserver for Progress {
  fn stage_started(&mut self, stage: Stage) {
    print_stage_info(stage, stage_activity(stage));
  }

  fn stage_succeeded(&mut self, stage: Stage, summary: &str) {
    print_stage_success(stage, summary);
  }

  fn stage_failed(&mut self, stage: Stage, error: &StageError) {
    print_stage_error(stage, &error.to_string());
  }

  fn upload_skipped(&mut self) {
    print_stage_warning(Stage::Publish, "BUCKET_NAME not set, skipping upload");
  }
}
