//! Archive publishing.
//!
//! Uploading is optional: without a bucket the stage is skipped and the run
//! still succeeds. With a bucket, any error from the object store fails the
//! run. Uploads are not retried and the local archive is only ever read.

mod gcs;

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{FactoryConfig, UserId};
use crate::consts::REMOTE_KEY_PREFIX;
use crate::package::Archive;

pub use gcs::{Bucket, Credentials, GcsClient, ObjectMetadata};

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid object store endpoint {endpoint}: {message}")]
  Endpoint { endpoint: String, message: String },

  #[error("failed to obtain access token: {0}")]
  Auth(String),

  #[error("request to {url} failed: {message}")]
  Request { url: String, message: String },

  #[error("object store returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("uploaded object {key} reports {remote} bytes, local archive has {local}")]
  SizeMismatch { key: String, local: u64, remote: u64 },
}

/// Destination of an upload.
pub trait ObjectStore {
  /// Uploads the full content of `source` to `key` in `bucket`.
  fn upload_file(&self, bucket: &str, key: &str, source: &Path)
  -> impl Future<Output = Result<(), PublishError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObject {
  pub bucket: String,
  pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
  /// No bucket configured.
  Skipped,
  Uploaded(RemoteObject),
}

/// `builds/<user>/<archive file name>`
pub fn object_key(user: &UserId, archive_file_name: &str) -> String {
  format!("{REMOTE_KEY_PREFIX}/{user}/{archive_file_name}")
}

pub async fn publish<S: ObjectStore>(
  store: &S,
  config: &FactoryConfig,
  archive: &Archive,
) -> Result<PublishOutcome, PublishError> {
  let Some(bucket) = config.bucket.as_deref() else {
    warn!("BUCKET_NAME not set, skipping upload");
    return Ok(PublishOutcome::Skipped);
  };

  let key = object_key(&config.user_id, &archive.file_name);
  info!(bucket, key = %key, "uploading archive");

  if let Err(e) = store.upload_file(bucket, &key, &archive.path).await {
    error!(bucket, key = %key, error = %e, "upload failed");
    return Err(e);
  }

  info!(bucket, key = %key, "upload complete");
  Ok(PublishOutcome::Uploaded(RemoteObject {
    bucket: bucket.to_string(),
    key,
  }))
}
