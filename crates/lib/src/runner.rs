//! External command execution.
//!
//! Commands are spawned from an explicit program and argument vector, never
//! through a shell, so the secret key and user identifier cannot be
//! reinterpreted by shell quoting. Standard output and error are inherited
//! so toolchain progress stays visible. Success is decided by the exit
//! status alone.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to start {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed waiting for {cmd}: {source}")]
  Wait {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },

  #[error("command timed out after {timeout:?}: {cmd}")]
  TimedOut { cmd: String, timeout: Duration },
}

#[derive(Debug, Clone)]
enum Arg {
  Plain(OsString),
  Secret(String),
}

impl Arg {
  fn as_os_str(&self) -> &OsStr {
    match self {
      Arg::Plain(value) => value.as_os_str(),
      Arg::Secret(value) => OsStr::new(value),
    }
  }
}

/// A program plus its argument vector.
///
/// `Display` renders the command line with secret arguments masked, so an
/// invocation can be logged safely.
#[derive(Debug, Clone)]
pub struct Invocation {
  program: OsString,
  args: Vec<Arg>,
  cwd: Option<PathBuf>,
}

impl Invocation {
  pub fn new(program: impl AsRef<OsStr>) -> Self {
    Self {
      program: program.as_ref().to_os_string(),
      args: Vec::new(),
      cwd: None,
    }
  }

  pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
    self.args.push(Arg::Plain(arg.as_ref().to_os_string()));
    self
  }

  /// Adds an argument that is passed through verbatim but masked in output.
  pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(Arg::Secret(arg.into()));
    self
  }

  pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cwd = Some(dir.as_ref().to_path_buf());
    self
  }

  pub fn cwd(&self) -> Option<&Path> {
    self.cwd.as_deref()
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.to_string_lossy())?;
    for arg in &self.args {
      match arg {
        Arg::Plain(value) => write!(f, " {}", value.to_string_lossy())?,
        Arg::Secret(_) => f.write_str(" ***")?,
      }
    }
    Ok(())
  }
}

/// Runs `invocation` to completion.
///
/// When `timeout` is set and elapses first, the child is killed and
/// `RunError::TimedOut` is returned. Without a timeout the call blocks for as
/// long as the child runs.
pub async fn run(invocation: &Invocation, timeout: Option<Duration>) -> Result<(), RunError> {
  let cmd = invocation.to_string();
  info!(cmd = %cmd, "executing command");

  let mut command = Command::new(&invocation.program);
  command
    .args(invocation.args.iter().map(Arg::as_os_str))
    .stdin(Stdio::null())
    .stdout(Stdio::inherit())
    .stderr(Stdio::inherit())
    .kill_on_drop(true);

  if let Some(cwd) = &invocation.cwd {
    command.current_dir(cwd);
  }

  debug!(cwd = ?invocation.cwd(), "spawning process");

  let mut child = command.spawn().map_err(|source| RunError::Spawn {
    cmd: cmd.clone(),
    source,
  })?;

  let waited = match timeout {
    Some(limit) => {
      let outcome = tokio::time::timeout(limit, child.wait()).await;
      match outcome {
        Ok(waited) => waited,
        Err(_) => {
          error!(cmd = %cmd, timeout = ?limit, "command timed out, killing");
          if let Err(e) = child.kill().await {
            debug!(error = %e, "failed to kill timed out command");
          }
          return Err(RunError::TimedOut { cmd, timeout: limit });
        }
      }
    }
    None => child.wait().await,
  };

  let status = waited.map_err(|source| RunError::Wait {
    cmd: cmd.clone(),
    source,
  })?;

  if !status.success() {
    error!(cmd = %cmd, code = ?status.code(), "command failed");
    return Err(RunError::Failed {
      cmd,
      code: status.code(),
    });
  }

  debug!(cmd = %cmd, "command succeeded");
  Ok(())
}
