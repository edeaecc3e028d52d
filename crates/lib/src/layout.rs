//! Fixed filesystem layout of a factory root.
//!
//! All paths are fixed relative to the root, which is why two factory runs
//! must never share a root at the same time. Only the archive name is
//! namespaced by user.

use std::path::{Path, PathBuf};

use crate::config::UserId;
use crate::consts::{
  AAR_PATH, ARCHIVE_EXTENSION, ARCHIVE_PREFIX, ASSETS_DIR, GRADLE_WRAPPER, HEADER_PATH, OUTPUT_DIR,
  PLACEHOLDER_FILENAME, SEALED_FILENAME, SEAL_TOOL_PATH, STAGING_DIR,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  root: PathBuf,
}

impl Layout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn assets_dir(&self) -> PathBuf {
    self.root.join(ASSETS_DIR)
  }

  /// Placeholder model fed to the sealing tool.
  pub fn placeholder(&self) -> PathBuf {
    self.assets_dir().join(PLACEHOLDER_FILENAME)
  }

  pub fn sealed(&self) -> PathBuf {
    self.assets_dir().join(SEALED_FILENAME)
  }

  pub fn header(&self) -> PathBuf {
    self.root.join(HEADER_PATH)
  }

  pub fn seal_tool(&self) -> PathBuf {
    self.root.join(SEAL_TOOL_PATH)
  }

  pub fn gradle_wrapper(&self) -> PathBuf {
    self.root.join(GRADLE_WRAPPER)
  }

  /// Where Gradle deposits the release library.
  pub fn build_output(&self) -> PathBuf {
    self.root.join(AAR_PATH)
  }

  pub fn staging_dir(&self) -> PathBuf {
    self.root.join(STAGING_DIR)
  }

  /// Persistent, shared output directory. Never cleared.
  pub fn output_dir(&self) -> PathBuf {
    self.root.join(OUTPUT_DIR)
  }

  pub fn archive_path(&self, user: &UserId) -> PathBuf {
    self.output_dir().join(archive_file_name(user))
  }
}

/// `tensorseal-<user>.zip`
pub fn archive_file_name(user: &UserId) -> String {
  format!("{ARCHIVE_PREFIX}{user}.{ARCHIVE_EXTENSION}")
}
