//! Zip archive creation.
//!
//! The archive is assembled in a temporary file next to its destination and
//! renamed into place once complete. Readers of the shared output directory
//! therefore see either the previous archive or the finished new one, and no
//! other file in the directory is touched.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::PackageError;
use super::staging::relative_name;

/// Compresses every file below `source_dir` into a zip at `dest`.
///
/// Entry names are relative to `source_dir` and sorted, so the same staging
/// contents always produce the same entry list. Returns the archive size.
pub fn write_zip(source_dir: &Path, dest: &Path) -> Result<u64, PackageError> {
  let write_error = |source| PackageError::Write {
    path: dest.to_path_buf(),
    source,
  };
  let zip_error = |source| PackageError::Archive {
    path: dest.to_path_buf(),
    source,
  };

  let parent = dest.parent().unwrap_or(Path::new("."));
  let mut temp = NamedTempFile::new_in(parent).map_err(write_error)?;

  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .unix_permissions(0o644);

  {
    let mut zip = ZipWriter::new(temp.as_file_mut());

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
      let entry = entry.map_err(|e| PackageError::Walk {
        path: source_dir.to_path_buf(),
        message: e.to_string(),
      })?;
      let name = relative_name(source_dir, entry.path());

      if entry.file_type().is_dir() {
        zip.add_directory(name, options).map_err(zip_error)?;
        continue;
      }

      zip.start_file(name.as_str(), options).map_err(zip_error)?;
      let mut file = File::open(entry.path()).map_err(write_error)?;
      io::copy(&mut file, &mut zip).map_err(write_error)?;
      debug!(entry = %name, "added archive entry");
    }

    zip.finish().map_err(zip_error)?;
  }

  temp.as_file().sync_all().map_err(write_error)?;
  set_shared_permissions(temp.path()).map_err(write_error)?;

  temp.persist(dest).map_err(|e| write_error(e.error))?;

  let size = fs::metadata(dest).map_err(write_error)?.len();
  Ok(size)
}

/// Temporary files are created owner-only; archives in the shared output
/// directory must be readable by other consumers.
#[cfg(unix)]
fn set_shared_permissions(path: &Path) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_shared_permissions(_path: &Path) -> io::Result<()> {
  Ok(())
}
