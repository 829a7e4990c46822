// orderflow/src/flow/pipeline.rs

//! `Pipeline<TData, Err>`: definition, handler registration and execution.

use super::branch::BranchBuilder;
use super::context_data::ContextData;
use super::control::{PipelineControl, PipelineResult};
use super::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use tracing::{event, Instrument, Level};

/// A boxed asynchronous step handler.
///
/// Handlers receive a clone of the run's `ContextData<TData>`. They must release
/// any lock guard before awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  name: String,
  steps: Vec<StepDef<TData>>,
  before: HashMap<String, Vec<Handler<TData, Err>>>,
  on: HashMap<String, Vec<Handler<TData, Err>>>,
  after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step name, optional, skip condition)` triples.
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name: name.into(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  // Handler registration against an undeclared step is a programming error.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "pipeline '{}' setup error: step '{}' is not declared",
        self.name, step_name
      );
    }
  }

  fn push_handler<F, UserErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let table = match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    };
    table.entry(step_name.to_string()).or_default().push(handler);
  }

  pub fn before_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, step_name, handler_fn);
  }

  pub fn on_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, step_name, handler_fn);
  }

  pub fn after_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, step_name, handler_fn);
  }

  pub(crate) fn push_on_handler(&mut self, step_name: &str, handler: Handler<TData, Err>) {
    self.ensure_step_exists(step_name);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Turns `step_name` into a branch: the `selector` picks the key, and the arm
  /// registered for that key becomes the step's `on` handler for this run.
  pub fn branch_on<K>(
    &mut self,
    step_name: &str,
    selector: impl Fn(&TData) -> K + Send + Sync + 'static,
  ) -> BranchBuilder<'_, TData, K, Err>
  where
    K: Eq + Hash + std::fmt::Debug + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    BranchBuilder::new(self, step_name.to_string(), selector)
  }

  fn handlers_for(&self, phase: Phase, step_name: &str) -> &[Handler<TData, Err>] {
    let table = match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    };
    table.get(step_name).map(Vec::as_slice).unwrap_or(&[])
  }

  async fn run_phase(
    &self,
    phase: Phase,
    step_name: &str,
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    for (idx, handler) in self.handlers_for(phase, step_name).iter().enumerate() {
      match handler(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, phase = phase.label(), handler_index = idx, "Pipeline stopped by handler.");
          return Ok(PipelineControl::Stop);
        }
        Err(e) => {
          event!(Level::WARN, phase = phase.label(), handler_index = idx, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  /// Runs every step in declaration order against `ctx_data`.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    let run_span = tracing::debug_span!("pipeline_run", pipeline = %self.name, num_steps = self.steps.len());
    self.run_steps(ctx_data).instrument(run_span).await
  }

  async fn run_steps(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = tracing::debug_span!("pipeline_step", step = step_name, step_index = step_idx);

      let control = async {
        if step_def.should_skip(&ctx_data) {
          event!(Level::DEBUG, "Step skipped by its skip condition.");
          return Ok(PipelineControl::Continue);
        }

        let has_handlers = [Phase::Before, Phase::On, Phase::After]
          .iter()
          .any(|phase| !self.handlers_for(*phase, step_name).is_empty());
        if !has_handlers {
          if step_def.optional {
            event!(Level::DEBUG, "Optional step has no handlers.");
            return Ok(PipelineControl::Continue);
          }
          event!(Level::ERROR, "Non-optional step has no handlers.");
          return Err(Err::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }

        for phase in [Phase::Before, Phase::On, Phase::After] {
          if self.run_phase(phase, step_name, &ctx_data).await? == PipelineControl::Stop {
            return Ok(PipelineControl::Stop);
          }
        }
        Ok::<PipelineControl, Err>(PipelineControl::Continue)
      }
      .instrument(step_span)
      .await?;

      if control == PipelineControl::Stop {
        return Ok(PipelineResult::Stopped {
          step: step_def.name.clone(),
        });
      }
    }

    event!(Level::DEBUG, pipeline = %self.name, "Pipeline completed.");
    Ok(PipelineResult::Completed)
  }
}
