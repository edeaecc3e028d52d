//! Artifact packaging.
//!
//! Packaging resets the staging directory, stages the release library and
//! the sealing tool under their canonical names, and compresses staging into
//! `dist/tensorseal-<user>.zip`. The output directory is created if needed
//! but never cleared: it is shared with other runs and other users.

mod archive;
mod staging;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::build::BuiltArtifact;
use crate::config::FactoryConfig;
use crate::consts::{STAGED_AAR_NAME, STAGED_TOOL_NAME};
use crate::layout::{Layout, archive_file_name};
use crate::util::hash::{ContentHash, hash_file};

pub use archive::write_zip;
pub use staging::StagingArea;

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("failed to prepare staging directory {path}: {source}")]
  Staging {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to create output directory {path}: {source}")]
  OutputDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read {path}: {message}")]
  Walk { path: PathBuf, message: String },

  #[error("failed to build archive {path}: {source}")]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("failed to write archive {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A distributable archive in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Archive {
  pub path: PathBuf,
  pub file_name: String,
  pub size: u64,
  pub sha256: ContentHash,
}

/// Stages the build output and the sealing tool and zips them for the
/// configured user.
pub fn package(config: &FactoryConfig, layout: &Layout, built: &BuiltArtifact) -> Result<Archive, PackageError> {
  let staging = StagingArea::reset(layout.staging_dir())?;
  staging.stage_file(&built.path, STAGED_AAR_NAME)?;
  staging.stage_file(&layout.seal_tool(), STAGED_TOOL_NAME)?;
  debug!(files = ?staging.file_names()?, "staging complete");

  let output_dir = layout.output_dir();
  std::fs::create_dir_all(&output_dir).map_err(|source| PackageError::OutputDir {
    path: output_dir.clone(),
    source,
  })?;

  let file_name = archive_file_name(&config.user_id);
  let path = output_dir.join(&file_name);
  let size = write_zip(staging.path(), &path)?;
  let sha256 = hash_file(&path).map_err(|source| PackageError::Write {
    path: path.clone(),
    source,
  })?;

  info!(archive = ?path, size, sha256 = %sha256, "archive written");

  Ok(Archive {
    path,
    file_name,
    size,
    sha256,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{FAKE_SEAL_TOOL, FakeRoot};
  use std::fs::{self, File};
  use std::io::Read;

  fn built(root: &FakeRoot) -> BuiltArtifact {
    root.write_file("app/build/outputs/aar/app-release.aar", "aar-bytes");
    BuiltArtifact {
      path: root.layout().build_output(),
    }
  }

  fn entries(path: &std::path::Path) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
      let mut file = archive.by_index(i).unwrap();
      let mut content = String::new();
      file.read_to_string(&mut content).unwrap();
      entries.push((file.name().to_string(), content));
    }
    entries
  }

  fn staged_names(layout: &Layout) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(layout.staging_dir())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    names.sort();
    names
  }

  #[test]
  fn archive_is_named_for_user_and_holds_two_entries() {
    let root = FakeRoot::new();
    let config = root.config(Some("alice"), None);
    let layout = root.layout();
    let built = built(&root);

    let archive = package(&config, &layout, &built).unwrap();

    assert_eq!(archive.file_name, "tensorseal-alice.zip");
    assert_eq!(archive.path, layout.output_dir().join("tensorseal-alice.zip"));
    assert_eq!(archive.sha256, hash_file(&archive.path).unwrap());
    assert_eq!(
      entries(&archive.path),
      vec![
        ("packer.py".to_string(), FAKE_SEAL_TOOL.to_string()),
        ("tensorseal.aar".to_string(), "aar-bytes".to_string()),
      ]
    );
  }

  #[test]
  fn repeated_packaging_is_idempotent_and_preserves_output() {
    let root = FakeRoot::new();
    let layout = root.layout();
    let built = built(&root);
    root.write_file("dist/tensorseal-carol.zip", "someone else's archive");

    let first = package(&root.config(Some("alice"), None), &layout, &built).unwrap();
    let staged_first = staged_names(&layout);

    let second = package(&root.config(Some("bob"), None), &layout, &built).unwrap();
    let staged_second = staged_names(&layout);

    assert_eq!(staged_first, vec!["packer.py", "tensorseal.aar"]);
    assert_eq!(staged_first, staged_second);
    assert!(first.path.exists());
    assert!(second.path.exists());
    assert_eq!(
      fs::read_to_string(layout.output_dir().join("tensorseal-carol.zip")).unwrap(),
      "someone else's archive"
    );
  }

  #[test]
  fn stale_staging_files_are_not_archived() {
    let root = FakeRoot::new();
    root.write_file("staging_temp/leftover.txt", "stale");
    let built = built(&root);

    let archive = package(&root.config(None, None), &root.layout(), &built).unwrap();

    let names: Vec<_> = entries(&archive.path).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["packer.py", "tensorseal.aar"]);
  }

  #[test]
  fn missing_build_output_fails_before_touching_output() {
    let root = FakeRoot::new();
    let built = BuiltArtifact {
      path: root.layout().build_output(),
    };

    let result = package(&root.config(None, None), &root.layout(), &built);

    assert!(matches!(result, Err(PackageError::Copy { .. })));
    assert!(!root.layout().output_dir().exists());
  }
}
