use anyhow::Result;
use tensorseal_lib::config::ConfigOverrides;
use tensorseal_lib::layout::Layout;

use super::load_config;
use crate::output::{OutputFormat, print_json, print_stat, print_success};

pub fn cmd_info(overrides: &ConfigOverrides, format: OutputFormat) -> Result<()> {
  let config = load_config(overrides, format)?;
  let summary = config.summary();

  if format.is_json() {
    return print_json(&summary);
  }

  let layout = Layout::new(&config.root);
  print_success(&format!("tensorseal-factory v{}", env!("CARGO_PKG_VERSION")));
  println!();
  print_stat("User", &summary.user_id);
  print_stat("Build key", summary.build_key);
  print_stat("Bucket", summary.bucket.as_deref().unwrap_or("(upload disabled)"));
  print_stat("Root", &summary.root.display().to_string());
  print_stat("Python", &summary.python);
  print_stat("Timeout", summary.stage_timeout.as_deref().unwrap_or("none"));
  print_stat("Archive", &layout.archive_path(&config.user_id).display().to_string());

  Ok(())
}
