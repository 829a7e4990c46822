// orderflow/src/flow/control.rs

/// Returned by every handler: keep going, or halt the whole pipeline here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  Stop,
}

/// Outcome of a pipeline run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every non-skipped step ran to the end.
  Completed,
  /// A handler of `step` returned `PipelineControl::Stop`.
  Stopped { step: String },
}

impl PipelineResult {
  pub fn is_completed(&self) -> bool {
    matches!(self, PipelineResult::Completed)
  }
}
