mod info;
mod run;

use anyhow::{Context, Result};
use serde::Serialize;
use tensorseal_lib::config::{ConfigOverrides, FactoryConfig};

use crate::output::{OutputFormat, print_config_error, print_json};

pub use info::cmd_info;
pub use run::cmd_run;

/// Machine-readable failure printed in place of a report.
#[derive(Serialize)]
struct Failure {
  state: &'static str,
  stage: &'static str,
  error: String,
}

impl Failure {
  fn new(stage: &'static str, error: String) -> Self {
    Failure {
      state: "failed",
      stage,
      error,
    }
  }
}

/// Resolves the configuration, reporting a failure on stdout before it is
/// returned.
fn load_config(overrides: &ConfigOverrides, format: OutputFormat) -> Result<FactoryConfig> {
  match FactoryConfig::from_env_with(overrides) {
    Ok(config) => Ok(config),
    Err(err) => {
      if format.is_json() {
        print_json(&Failure::new("config", err.to_string()))?;
      } else {
        print_config_error(&err.to_string());
      }
      Err(err).context("Invalid configuration")
    }
  }
}
