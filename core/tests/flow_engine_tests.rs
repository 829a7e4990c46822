// tests/flow_engine_tests.rs
mod common;

use common::*;
use orderflow::flow::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition, Unmatched};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "ordered",
    &[("step1", false, None), ("step2", false, None), ("step3", false, None)],
  );
  pipeline.on_root("step1", recording_handler("step1"));
  pipeline.on_root("step2", recording_handler("step2"));
  pipeline.on_root("step3", recording_handler("step3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_hooks_run_in_phase_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("hooks", &[("only", false, None)]);
  pipeline.after_root("only", recording_handler("after"));
  pipeline.on_root("only", recording_handler("on"));
  pipeline.before_root("only", recording_handler("before"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["before", "on", "after"]);
}

#[tokio::test]
#[serial]
async fn test_stop_halts_remaining_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "stopping",
    &[("a", false, None), ("halt", false, None), ("c", false, None)],
  );
  pipeline.on_root("a", recording_handler("a"));
  pipeline.on_root("halt", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("halt".to_string());
      Ok::<_, TestError>(PipelineControl::Stop)
    })
  });
  pipeline.on_root("c", recording_handler("c"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(
    result,
    PipelineResult::Stopped {
      step: "halt".to_string()
    }
  );
  assert_eq!(ctx.read().steps_executed, vec!["a", "halt"]);
}

#[tokio::test]
#[serial]
async fn test_handler_error_propagates_and_halts() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("failing", &[("bad", false, None), ("never", false, None)]);
  pipeline.on_root("bad", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Err::<PipelineControl, _>(TestError::Handler("boom".to_string())) })
  });
  pipeline.on_root("never", recording_handler("never"));

  let ctx = ContextData::new(TestContext::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("boom".to_string()));
  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn test_missing_handlers_fail_only_for_required_steps() {
  setup_tracing();
  let mut optional = Pipeline::<TestContext, TestError>::new("optional", &[("a", false, None), ("maybe", true, None)]);
  optional.on_root("a", recording_handler("a"));
  let ctx = ContextData::new(TestContext::default());
  assert!(optional.run(ctx).await.unwrap().is_completed());

  let required = Pipeline::<TestContext, TestError>::new("required", &[("needed", false, None)]);
  let err = required.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert!(matches!(err, TestError::Flow(ref msg) if msg.contains("HandlerMissing")));
}

#[tokio::test]
#[serial]
async fn test_skip_condition_bypasses_step() {
  setup_tracing();
  let skip_b: SkipCondition<TestContext> = Arc::new(|ctx: &TestContext| ctx.skip_b);
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "skipping",
    &[("a", false, None), ("b", false, Some(skip_b)), ("c", false, None)],
  );
  pipeline.on_root("a", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      {
        let mut guard = ctx.write();
        guard.steps_executed.push("a".to_string());
        guard.skip_b = true;
      }
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  pipeline.on_root("b", recording_handler("b"));
  pipeline.on_root("c", recording_handler("c"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["a", "c"]);
}

fn routed_pipeline(unmatched: Unmatched) -> Pipeline<TestContext, TestError> {
  let mut pipeline = Pipeline::<TestContext, TestError>::new("routed", &[("route", false, None), ("after", false, None)]);
  pipeline
    .branch_on("route", |ctx: &TestContext| ctx.route.clone())
    .arm(Some("left".to_string()), recording_handler("left"))
    .arm(Some("right".to_string()), recording_handler("right"))
    .if_unmatched(unmatched)
    .finalize();
  pipeline.on_root("after", recording_handler("after"));
  pipeline
}

#[tokio::test]
#[serial]
async fn test_branch_runs_only_the_selected_arm() {
  setup_tracing();
  let pipeline = routed_pipeline(Unmatched::Fail);
  let ctx = ContextData::new(TestContext {
    route: Some("right".to_string()),
    ..Default::default()
  });

  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["right", "after"]);
}

#[tokio::test]
#[serial]
async fn test_unmatched_branch_stops_or_fails_as_configured() {
  setup_tracing();

  let stopping = routed_pipeline(Unmatched::Stop);
  let ctx = ContextData::new(TestContext {
    route: Some("up".to_string()),
    ..Default::default()
  });
  let result = stopping.run(ctx.clone()).await.unwrap();
  assert_eq!(
    result,
    PipelineResult::Stopped {
      step: "route".to_string()
    }
  );
  assert!(ctx.read().steps_executed.is_empty());

  let failing = routed_pipeline(Unmatched::Fail);
  let err = failing.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert!(matches!(err, TestError::Flow(ref msg) if msg.contains("NoBranchMatched")));
}

#[test]
#[should_panic(expected = "is not declared")]
fn test_registering_on_undeclared_step_panics() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new("strict", &[("known", false, None)]);
  pipeline.on_root("unknown", recording_handler("unknown"));
}
