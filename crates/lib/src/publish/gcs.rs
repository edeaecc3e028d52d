//! Google Cloud Storage client over the JSON API.
//!
//! Only simple media uploads are implemented. Objects are written in a single
//! request, so a failed upload never leaves a partial object behind.

use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::{ObjectStore, PublishError};
use crate::config::Secret;

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
  "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

pub const ENV_EMULATOR_HOST: &str = "STORAGE_EMULATOR_HOST";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// How requests are authorized.
#[derive(Debug, Clone)]
pub enum Credentials {
  /// Emulators accept unauthenticated requests.
  Anonymous,
  Token(Secret),
  /// Fetch a token from the instance metadata server before each upload.
  MetadataServer { url: String },
}

/// Object resource returned by a successful upload. Only the fields the
/// factory checks are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub bucket: Option<String>,
  /// Decimal string, as the JSON API encodes 64-bit integers.
  #[serde(default)]
  pub size: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
}

#[derive(Debug, Clone)]
pub struct GcsClient {
  http: Client,
  endpoint: String,
  credentials: Credentials,
}

impl GcsClient {
  pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
    Self {
      http: Client::new(),
      endpoint: endpoint.into().trim_end_matches('/').to_string(),
      credentials,
    }
  }

  /// Picks endpoint and credentials from the environment.
  ///
  /// `STORAGE_EMULATOR_HOST` selects an emulator without authentication.
  /// Otherwise `GOOGLE_OAUTH_ACCESS_TOKEN` is used when set, falling back to
  /// the metadata server.
  pub fn from_env() -> Self {
    if let Some(host) = non_empty_env(ENV_EMULATOR_HOST) {
      let endpoint = if host.contains("://") {
        host
      } else {
        format!("http://{host}")
      };
      debug!(endpoint = %endpoint, "using storage emulator");
      return Self::new(endpoint, Credentials::Anonymous);
    }

    let credentials = match non_empty_env(ENV_ACCESS_TOKEN) {
      Some(token) => Credentials::Token(Secret::new(token)),
      None => Credentials::MetadataServer {
        url: METADATA_TOKEN_URL.to_string(),
      },
    };
    Self::new(DEFAULT_ENDPOINT, credentials)
  }

  pub fn bucket(&self, name: &str) -> Bucket<'_> {
    Bucket {
      client: self,
      name: name.to_string(),
    }
  }

  async fn access_token(&self) -> Result<Option<String>, PublishError> {
    match &self.credentials {
      Credentials::Anonymous => Ok(None),
      Credentials::Token(token) => Ok(Some(token.expose().to_string())),
      Credentials::MetadataServer { url } => {
        let response = self
          .http
          .get(url)
          .header("Metadata-Flavor", "Google")
          .send()
          .await
          .map_err(|e| PublishError::Auth(e.to_string()))?;

        if !response.status().is_success() {
          return Err(PublishError::Auth(format!(
            "metadata server returned HTTP {}",
            response.status().as_u16()
          )));
        }

        let token: TokenResponse = response
          .json()
          .await
          .map_err(|e| PublishError::Auth(e.to_string()))?;
        Ok(Some(token.access_token))
      }
    }
  }

  fn upload_url(&self, bucket: &str, key: &str) -> Result<Url, PublishError> {
    let invalid = |message: String| PublishError::Endpoint {
      endpoint: self.endpoint.clone(),
      message,
    };

    let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|()| invalid("endpoint cannot be a base URL".to_string()))?
      .pop_if_empty()
      .extend(["upload", "storage", "v1", "b", bucket, "o"]);
    url
      .query_pairs_mut()
      .append_pair("uploadType", "media")
      .append_pair("name", key);
    Ok(url)
  }
}

/// Handle to one bucket.
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
  client: &'a GcsClient,
  name: String,
}

impl Bucket<'_> {
  /// Uploads the whole of `source` as object `key`, replacing any existing
  /// object with that name.
  pub async fn upload_from_file(&self, key: &str, source: &Path) -> Result<ObjectMetadata, PublishError> {
    let body = tokio::fs::read(source).await.map_err(|e| PublishError::Read {
      path: source.to_path_buf(),
      source: e,
    })?;
    let local = body.len() as u64;

    let url = self.client.upload_url(&self.name, key)?;
    let mut request = self
      .client
      .http
      .post(url.clone())
      .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
      .body(body);
    if let Some(token) = self.client.access_token().await? {
      request = request.bearer_auth(token);
    }

    debug!(bucket = %self.name, key, bytes = local, "sending upload request");
    let response = request.send().await.map_err(|e| PublishError::Request {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(PublishError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let metadata: ObjectMetadata = response.json().await.unwrap_or_default();
    if let Some(remote) = metadata.size.as_deref().and_then(|s| s.parse::<u64>().ok())
      && remote != local
    {
      return Err(PublishError::SizeMismatch {
        key: key.to_string(),
        local,
        remote,
      });
    }

    Ok(metadata)
  }
}

impl ObjectStore for GcsClient {
  async fn upload_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), PublishError> {
    self.bucket(bucket).upload_from_file(key, source).await.map(|_| ())
  }
}

fn non_empty_env(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
