//! Stage orchestration.
//!
//! A run is a fixed sequence of stages: inject the key, build, package and
//! publish. Each stage either yields its output or fails the run, and the
//! first failure halts everything after it.

mod state;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::build::{BuildError, build_release};
use crate::config::{FactoryConfig, UserId};
use crate::inject::{InjectError, inject_key};
use crate::layout::Layout;
use crate::package::{Archive, PackageError, package};
use crate::publish::{ObjectStore, PublishError, PublishOutcome, RemoteObject, publish};

pub use state::{PipelineState, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  InjectKey,
  Build,
  Package,
  Publish,
}

impl Stage {
  /// Short label used as the progress prefix.
  pub fn label(self) -> &'static str {
    match self {
      Stage::InjectKey => "inject",
      Stage::Build => "build",
      Stage::Package => "package",
      Stage::Publish => "publish",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Error)]
pub enum StageError {
  #[error(transparent)]
  Inject(#[from] InjectError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Publish(#[from] PublishError),

  #[error(transparent)]
  Transition(#[from] TransitionError),
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
  pub stage: Stage,
  #[source]
  pub source: StageError,
}

/// Progress hooks. All methods default to doing nothing.
pub trait PipelineObserver {
  fn stage_started(&mut self, _stage: Stage) {}

  fn stage_succeeded(&mut self, _stage: Stage, _summary: &str) {}

  fn stage_failed(&mut self, _stage: Stage, _error: &StageError) {}

  fn upload_skipped(&mut self) {}
}

impl PipelineObserver for () {}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
  pub user_id: UserId,
  pub state: PipelineState,
  pub archive: Archive,
  /// `None` when no bucket was configured.
  pub remote: Option<RemoteObject>,
}

pub struct Pipeline<'a, S> {
  config: &'a FactoryConfig,
  store: &'a S,
  layout: Layout,
}

impl<'a, S: ObjectStore> Pipeline<'a, S> {
  pub fn new(config: &'a FactoryConfig, store: &'a S) -> Self {
    Self {
      config,
      store,
      layout: Layout::new(&config.root),
    }
  }

  /// Runs every stage from `Start`.
  pub async fn run<O: PipelineObserver + ?Sized>(&self, observer: &mut O) -> Result<PipelineReport, PipelineError> {
    let mut run = Run::default();
    info!(
      user = %self.config.user_id,
      root = ?self.layout.root(),
      upload = self.config.upload_enabled(),
      "starting factory run"
    );

    observer.stage_started(Stage::InjectKey);
    let sealed = run.finish(
      observer,
      Stage::InjectKey,
      PipelineState::KeyInjected,
      inject_key(self.config, &self.layout).await,
    )?;
    observer.stage_succeeded(Stage::InjectKey, &format!("sealed {}", sealed.sealed.display()));

    observer.stage_started(Stage::Build);
    let built = run.finish(
      observer,
      Stage::Build,
      PipelineState::Built,
      build_release(self.config, &self.layout).await,
    )?;
    observer.stage_succeeded(Stage::Build, &format!("built {}", built.path.display()));

    observer.stage_started(Stage::Package);
    let archive = run.finish(
      observer,
      Stage::Package,
      PipelineState::Packaged,
      package(self.config, &self.layout, &built),
    )?;
    observer.stage_succeeded(
      Stage::Package,
      &format!("wrote {} ({} bytes)", archive.path.display(), archive.size),
    );

    observer.stage_started(Stage::Publish);
    let outcome = publish(self.store, self.config, &archive).await;
    let next = match &outcome {
      Ok(PublishOutcome::Uploaded(_)) => PipelineState::Published,
      _ => PipelineState::SkippedUpload,
    };
    let remote = match run.finish(observer, Stage::Publish, next, outcome)? {
      PublishOutcome::Uploaded(remote) => {
        observer.stage_succeeded(
          Stage::Publish,
          &format!("uploaded gs://{}/{}", remote.bucket, remote.key),
        );
        Some(remote)
      }
      PublishOutcome::Skipped => {
        observer.upload_skipped();
        None
      }
    };

    run.advance(Stage::Publish, PipelineState::Done)?;
    info!(archive = ?archive.path, uploaded = remote.is_some(), "factory run complete");

    Ok(PipelineReport {
      user_id: self.config.user_id.clone(),
      state: run.state,
      archive,
      remote,
    })
  }
}

/// State of one run in progress.
struct Run {
  state: PipelineState,
}

impl Default for Run {
  fn default() -> Self {
    Self {
      state: PipelineState::Start,
    }
  }
}

impl Run {
  fn advance(&mut self, stage: Stage, next: PipelineState) -> Result<(), PipelineError> {
    self.state = self
      .state
      .transition(next)
      .map_err(|e| PipelineError { stage, source: e.into() })?;
    debug!(state = %self.state, "pipeline state changed");
    Ok(())
  }

  fn finish<T, E, O>(
    &mut self,
    observer: &mut O,
    stage: Stage,
    next: PipelineState,
    result: Result<T, E>,
  ) -> Result<T, PipelineError>
  where
    E: Into<StageError>,
    O: PipelineObserver + ?Sized,
  {
    match result {
      Ok(value) => {
        self.advance(stage, next)?;
        Ok(value)
      }
      Err(e) => {
        let source = e.into();
        error!(stage = %stage, error = %source, "stage failed");
        observer.stage_failed(stage, &source);
        self.state = PipelineState::Failed;
        Err(PipelineError { stage, source })
      }
    }
  }
}
