//! Release build of the native library.
//!
//! Runs the Gradle wrapper and then checks for the AAR. A zero exit status
//! is not enough on its own: an application module builds successfully
//! without ever producing a library archive.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::FactoryConfig;
use crate::consts::GRADLE_TASK;
use crate::layout::Layout;
use crate::runner::{self, Invocation, RunError};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to make {path} executable: {source}")]
  Permissions {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("gradle build failed: {0}")]
  Command(#[from] RunError),

  #[error("failed to inspect build output {path}: {source}")]
  Inspect {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(
    "build reported success but {path} was not produced \
     (is the app module configured with the 'com.android.library' plugin?)"
  )]
  ArtifactMissing { path: PathBuf },
}

/// The compiled release library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
  pub path: PathBuf,
}

/// `./gradlew :app:assembleRelease --no-daemon`, run from the root.
pub fn gradle_invocation(layout: &Layout) -> Invocation {
  Invocation::new(layout.gradle_wrapper())
    .arg(GRADLE_TASK)
    .arg("--no-daemon")
    .current_dir(layout.root())
}

pub async fn build_release(config: &FactoryConfig, layout: &Layout) -> Result<BuiltArtifact, BuildError> {
  let wrapper = layout.gradle_wrapper();
  ensure_executable(&wrapper)?;

  info!(task = GRADLE_TASK, "running gradle build");
  runner::run(&gradle_invocation(layout), config.stage_timeout).await?;

  let path = layout.build_output();
  let exists = tokio::fs::try_exists(&path)
    .await
    .map_err(|source| BuildError::Inspect {
      path: path.clone(),
      source,
    })?;
  if !exists {
    error!(path = ?path, "build output missing after successful build");
    return Err(BuildError::ArtifactMissing { path });
  }

  debug!(path = ?path, "found build output");
  Ok(BuiltArtifact { path })
}

/// Adds the execute bits to `path`, keeping its other permission bits.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), BuildError> {
  use std::os::unix::fs::PermissionsExt;

  let to_error = |source| BuildError::Permissions {
    path: path.to_path_buf(),
    source,
  };

  let mut permissions = std::fs::metadata(path).map_err(to_error)?.permissions();
  let mode = permissions.mode();
  if mode & 0o111 != 0o111 {
    permissions.set_mode(mode | 0o111);
    std::fs::set_permissions(path, permissions).map_err(to_error)?;
    debug!(path = ?path, "marked build wrapper executable");
  }
  Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), BuildError> {
  Ok(())
}
