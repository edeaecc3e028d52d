//! Run state machine.
//!
//! ```text
//! Start -> KeyInjected -> Built -> Packaged -> Published     -> Done
//!                                           \-> SkippedUpload -/
//! ```
//!
//! `Failed` is reachable from every non-terminal state and absorbs. There is
//! no way back: a failed run starts over from `Start`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
  Start,
  KeyInjected,
  Built,
  Packaged,
  Published,
  SkippedUpload,
  Done,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid pipeline transition from {from} to {to}")]
pub struct TransitionError {
  pub from: PipelineState,
  pub to: PipelineState,
}

impl PipelineState {
  pub fn as_str(self) -> &'static str {
    match self {
      PipelineState::Start => "start",
      PipelineState::KeyInjected => "key_injected",
      PipelineState::Built => "built",
      PipelineState::Packaged => "packaged",
      PipelineState::Published => "published",
      PipelineState::SkippedUpload => "skipped_upload",
      PipelineState::Done => "done",
      PipelineState::Failed => "failed",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, PipelineState::Done | PipelineState::Failed)
  }

  pub fn can_transition_to(self, next: PipelineState) -> bool {
    use PipelineState::*;

    if next == Failed {
      return !self.is_terminal();
    }
    matches!(
      (self, next),
      (Start, KeyInjected)
        | (KeyInjected, Built)
        | (Built, Packaged)
        | (Packaged, Published)
        | (Packaged, SkippedUpload)
        | (Published, Done)
        | (SkippedUpload, Done)
    )
  }

  pub fn transition(self, next: PipelineState) -> Result<PipelineState, TransitionError> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(TransitionError { from: self, to: next })
    }
  }
}

impl fmt::Display for PipelineState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
