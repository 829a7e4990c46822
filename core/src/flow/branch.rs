// orderflow/src/flow/branch.rs

//! Keyed branching inside a single step.
//!
//! A branch step computes a key from the context (payment method, capture
//! policy) and runs the one arm registered for that key.

use super::context_data::ContextData;
use super::control::PipelineControl;
use super::pipeline::{Handler, Pipeline};
use crate::error::FlowError;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{event, Level};

type ArmFn<TData, Err> = dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
  + Send
  + Sync;

/// What a branch step does when no arm is registered for the selected key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmatched {
  /// Halt the pipeline without error.
  Stop,
  /// Fail with `FlowError::NoBranchMatched`.
  Fail,
}

pub struct BranchBuilder<'p, TData, K, Err>
where
  TData: 'static + Send + Sync,
  K: Eq + Hash + std::fmt::Debug + Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: &'p mut Pipeline<TData, Err>,
  step_name: String,
  selector: Arc<dyn Fn(&TData) -> K + Send + Sync + 'static>,
  arms: HashMap<K, Arc<ArmFn<TData, Err>>>,
  unmatched: Unmatched,
}

impl<'p, TData, K, Err> BranchBuilder<'p, TData, K, Err>
where
  TData: 'static + Send + Sync,
  K: Eq + Hash + std::fmt::Debug + Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(
    pipeline: &'p mut Pipeline<TData, Err>,
    step_name: String,
    selector: impl Fn(&TData) -> K + Send + Sync + 'static,
  ) -> Self {
    Self {
      pipeline,
      step_name,
      selector: Arc::new(selector),
      arms: HashMap::new(),
      unmatched: Unmatched::Fail,
    }
  }

  /// Registers the arm that runs when the selector yields `key`.
  /// A later arm for the same key replaces the earlier one.
  pub fn arm<F, UserErr>(
    mut self,
    key: K,
    arm_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Self
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    let arm: Arc<ArmFn<TData, Err>> = Arc::new(move |ctx_data| {
      let fut = arm_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.arms.insert(key, arm);
    self
  }

  pub fn if_unmatched(mut self, unmatched: Unmatched) -> Self {
    self.unmatched = unmatched;
    self
  }

  /// Installs the branch as the step's `on` handler.
  pub fn finalize(self) {
    let BranchBuilder {
      pipeline,
      step_name,
      selector,
      arms,
      unmatched,
    } = self;
    let arms = Arc::new(arms);
    let step_for_handler = step_name.clone();

    let handler: Handler<TData, Err> = Box::new(move |ctx_data: ContextData<TData>| {
      let key = ctx_data.with(|data| selector(data));
      let arm = arms.get(&key).cloned();
      let key_label = format!("{:?}", key);
      let step_name = step_for_handler.clone();
      Box::pin(async move {
        match arm {
          Some(arm) => {
            event!(Level::DEBUG, step = %step_name, key = %key_label, "Branch arm selected.");
            arm(ctx_data).await
          }
          None if unmatched == Unmatched::Stop => {
            event!(Level::INFO, step = %step_name, key = %key_label, "No branch arm for key, stopping.");
            Ok(PipelineControl::Stop)
          }
          None => {
            event!(Level::ERROR, step = %step_name, key = %key_label, "No branch arm for key.");
            Err(Err::from(FlowError::NoBranchMatched {
              step_name,
              key: key_label,
            }))
          }
        }
      })
    });

    pipeline.push_on_handler(&step_name, handler);
  }
}
