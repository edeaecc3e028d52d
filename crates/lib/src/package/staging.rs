//! The staging directory.
//!
//! Staging is exclusively owned by one run. `reset` is the only destructive
//! filesystem operation in the factory and is scoped to the staging path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::PackageError;

#[derive(Debug)]
pub struct StagingArea {
  path: PathBuf,
}

impl StagingArea {
  /// Recursively deletes `path` if it exists and recreates it empty.
  pub fn reset(path: impl Into<PathBuf>) -> Result<Self, PackageError> {
    let path = path.into();
    let to_error = |source| PackageError::Staging {
      path: path.clone(),
      source,
    };

    if fs::symlink_metadata(&path).is_ok() {
      debug!(path = ?path, "removing previous staging directory");
      fs::remove_dir_all(&path).map_err(to_error)?;
    }
    fs::create_dir_all(&path).map_err(to_error)?;

    Ok(Self { path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Copies `source` into staging as `name` and returns the staged path.
  pub fn stage_file(&self, source: &Path, name: &str) -> Result<PathBuf, PackageError> {
    let dest = self.path.join(name);
    fs::copy(source, &dest).map_err(|e| PackageError::Copy {
      from: source.to_path_buf(),
      to: dest.clone(),
      source: e,
    })?;
    debug!(from = ?source, to = ?dest, "staged file");
    Ok(dest)
  }

  /// Names of the files currently staged, sorted.
  pub fn file_names(&self) -> Result<Vec<String>, PackageError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(&self.path).min_depth(1).sort_by_file_name() {
      let entry = entry.map_err(|e| PackageError::Walk {
        path: self.path.clone(),
        message: e.to_string(),
      })?;
      if entry.file_type().is_file() {
        names.push(relative_name(&self.path, entry.path()));
      }
    }
    Ok(names)
  }
}

/// Forward-slash path of `path` relative to `base`, as stored in archives.
pub(crate) fn relative_name(base: &Path, path: &Path) -> String {
  path
    .strip_prefix(base)
    .unwrap_or(path)
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
