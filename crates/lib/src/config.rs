//! Factory configuration.
//!
//! The configuration is read from the process environment exactly once,
//! validated before any filesystem or process work happens, and then passed
//! by reference to every stage.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::consts::{
  DEFAULT_PYTHON, DEFAULT_USER_ID, ENV_BUCKET_NAME, ENV_BUILD_KEY, ENV_PYTHON, ENV_REQUIRE_USER_ID, ENV_ROOT,
  ENV_STAGE_TIMEOUT, ENV_USER_ID,
};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("BUILD_KEY is missing")]
  MissingBuildKey,

  #[error("USER_ID is missing and a user identifier is required")]
  MissingUserId,

  #[error("invalid user identifier {value:?}: {reason}")]
  InvalidUserId { value: String, reason: &'static str },

  #[error("invalid stage timeout {value:?}: {message}")]
  InvalidTimeout { value: String, message: String },

  #[error("failed to determine current directory: {0}")]
  CurrentDir(#[source] std::io::Error),

  #[error("factory root {path} is not accessible: {source}")]
  Root {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A secret value that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  /// Returns the raw secret for handing to a child process or request.
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Secret(***)")
  }
}

impl fmt::Display for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("***")
  }
}

/// A user identifier that is safe to use as a file name component and as an
/// object key segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  pub fn parse(value: &str) -> Result<Self, ConfigError> {
    let invalid = |reason| ConfigError::InvalidUserId {
      value: value.to_string(),
      reason,
    };

    if value.is_empty() {
      return Err(invalid("must not be empty"));
    }
    if value == "." || value == ".." {
      return Err(invalid("must not be a relative path component"));
    }
    if value.contains(['/', '\\']) {
      return Err(invalid("must not contain path separators"));
    }
    if value.chars().any(char::is_control) {
      return Err(invalid("must not contain control characters"));
    }

    Ok(Self(value.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Values supplied on the command line. They take precedence over the
/// corresponding `FACTORY_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub root: Option<PathBuf>,
  pub python: Option<String>,
  pub stage_timeout: Option<Duration>,
  pub require_user_id: bool,
}

/// Validated configuration for a single factory run.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
  pub build_key: Secret,
  pub user_id: UserId,
  /// Upload target. `None` disables the publish stage.
  pub bucket: Option<String>,
  /// Directory the fixed layout is resolved against.
  pub root: PathBuf,
  /// Interpreter used to run the sealing tool.
  pub python: String,
  /// Upper bound for every subprocess. `None` waits forever.
  pub stage_timeout: Option<Duration>,
}

/// Redacted view of the configuration for display.
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
  pub user_id: String,
  pub bucket: Option<String>,
  pub root: PathBuf,
  pub python: String,
  pub stage_timeout: Option<String>,
  pub build_key: &'static str,
}

impl FactoryConfig {
  /// Builds a configuration from explicit values, rooted at `root`.
  ///
  /// A missing user identifier falls back to `local-test-user`.
  pub fn new(build_key: &str, user_id: Option<&str>, bucket: Option<&str>, root: &Path) -> Result<Self, ConfigError> {
    let build_key = parse_build_key(Some(build_key.to_string()))?;
    let user_id = UserId::parse(user_id.unwrap_or(DEFAULT_USER_ID))?;
    let root = canonical_root(root.to_path_buf())?;

    Ok(Self {
      build_key,
      user_id,
      bucket: bucket.filter(|b| !b.trim().is_empty()).map(str::to_string),
      root,
      python: DEFAULT_PYTHON.to_string(),
      stage_timeout: None,
    })
  }

  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_env_with(&ConfigOverrides::default())
  }

  /// Reads the configuration from the environment, applying `overrides`.
  ///
  /// The build key is checked first so that a run without one fails before
  /// anything else is inspected.
  pub fn from_env_with(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    let build_key = parse_build_key(env_var(ENV_BUILD_KEY))?;

    let require_user_id = overrides.require_user_id || env_var(ENV_REQUIRE_USER_ID).is_some_and(|v| is_truthy(&v));
    let user_id = match env_var(ENV_USER_ID) {
      Some(value) => UserId::parse(&value)?,
      None if require_user_id => return Err(ConfigError::MissingUserId),
      None => {
        warn!(default = DEFAULT_USER_ID, "USER_ID not set, using default user identifier");
        UserId::parse(DEFAULT_USER_ID)?
      }
    };

    let bucket = env_var(ENV_BUCKET_NAME).filter(|b| !b.trim().is_empty());

    let stage_timeout = match overrides.stage_timeout {
      Some(timeout) => Some(timeout),
      None => env_var(ENV_STAGE_TIMEOUT).map(|v| parse_timeout(&v)).transpose()?,
    };

    let python = overrides
      .python
      .clone()
      .or_else(|| env_var(ENV_PYTHON))
      .unwrap_or_else(|| DEFAULT_PYTHON.to_string());

    let root = match overrides.root.clone().or_else(|| env_var(ENV_ROOT).map(PathBuf::from)) {
      Some(root) => root,
      None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
    };
    let root = canonical_root(root)?;

    Ok(Self {
      build_key,
      user_id,
      bucket,
      root,
      python,
      stage_timeout,
    })
  }

  pub fn with_python(mut self, python: impl Into<String>) -> Self {
    self.python = python.into();
    self
  }

  pub fn upload_enabled(&self) -> bool {
    self.bucket.is_some()
  }

  pub fn summary(&self) -> ConfigSummary {
    ConfigSummary {
      user_id: self.user_id.to_string(),
      bucket: self.bucket.clone(),
      root: self.root.clone(),
      python: self.python.clone(),
      stage_timeout: self
        .stage_timeout
        .map(|t| humantime::format_duration(t).to_string()),
      build_key: "***",
    }
  }
}

/// Parses a humantime duration such as `90s` or `30m`.
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
  humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidTimeout {
    value: value.to_string(),
    message: e.to_string(),
  })
}

fn parse_build_key(value: Option<String>) -> Result<Secret, ConfigError> {
  match value {
    Some(key) if !key.trim().is_empty() => Ok(Secret::new(key)),
    _ => Err(ConfigError::MissingBuildKey),
  }
}

fn canonical_root(root: PathBuf) -> Result<PathBuf, ConfigError> {
  dunce::canonicalize(&root).map_err(|source| ConfigError::Root { path: root, source })
}

/// Reads an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
  matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
