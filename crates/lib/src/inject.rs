//! Key injection.
//!
//! Writes a placeholder model into the assets directory and runs the sealing
//! tool over it. The tool produces the sealed model and a C header that
//! embeds the key for the native build.

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::config::FactoryConfig;
use crate::consts::PLACEHOLDER_CONTENT;
use crate::layout::Layout;
use crate::runner::{self, Invocation, RunError};

#[derive(Debug, Error)]
pub enum InjectError {
  #[error("failed to create assets directory {path}: {source}")]
  AssetsDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write placeholder {path}: {source}")]
  Placeholder {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("sealing tool failed: {0}")]
  Tool(#[from] RunError),
}

/// Files the sealing tool is expected to leave behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedArtifacts {
  pub sealed: PathBuf,
  pub header: PathBuf,
}

/// `<python> tools/tensorseal.py --input .. --output .. --header .. --key ..`
pub fn seal_invocation(config: &FactoryConfig, layout: &Layout) -> Invocation {
  Invocation::new(&config.python)
    .arg(layout.seal_tool())
    .arg("--input")
    .arg(layout.placeholder())
    .arg("--output")
    .arg(layout.sealed())
    .arg("--header")
    .arg(layout.header())
    .arg("--key")
    .secret_arg(config.build_key.expose())
    .current_dir(layout.root())
}

/// Prepares the placeholder and seals it with the configured key.
pub async fn inject_key(config: &FactoryConfig, layout: &Layout) -> Result<SealedArtifacts, InjectError> {
  let assets_dir = layout.assets_dir();
  fs::create_dir_all(&assets_dir)
    .await
    .map_err(|source| InjectError::AssetsDir {
      path: assets_dir.clone(),
      source,
    })?;

  let placeholder = layout.placeholder();
  fs::write(&placeholder, PLACEHOLDER_CONTENT)
    .await
    .map_err(|source| InjectError::Placeholder {
      path: placeholder.clone(),
      source,
    })?;
  debug!(path = ?placeholder, bytes = PLACEHOLDER_CONTENT.len(), "wrote placeholder model");

  info!(user = %config.user_id, "running sealing tool");
  runner::run(&seal_invocation(config, layout), config.stage_timeout).await?;

  Ok(SealedArtifacts {
    sealed: layout.sealed(),
    header: layout.header(),
  })
}
