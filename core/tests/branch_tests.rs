// tests/branch_tests.rs
mod common;

use common::*;
use conveyor::{Flow, FlowError, Outcome, Shared, StepSpec, Workflow};
use serial_test::serial;
use std::sync::{atomic::Ordering, Arc};

fn upper_flow() -> Arc<Workflow<SubContext, TestError>> {
  let mut wf = Workflow::<SubContext, TestError>::new("upper", [StepSpec::required("transform")]);
  wf.on("transform", |sub: Shared<SubContext>| async move {
    SUB_RUNS.fetch_add(1, Ordering::SeqCst);
    let mut guard = sub.write();
    guard.output = guard.input.to_uppercase();
    Ok::<_, TestError>(Flow::Continue)
  });
  Arc::new(wf)
}

fn reverse_flow() -> Arc<Workflow<SubContext, TestError>> {
  let mut wf = Workflow::<SubContext, TestError>::new("reverse", [StepSpec::required("transform")]);
  wf.on("transform", |sub: Shared<SubContext>| async move {
    SUB_RUNS.fetch_add(1, Ordering::SeqCst);
    let mut guard = sub.write();
    guard.output = guard.input.chars().rev().collect();
    Ok::<_, TestError>(Flow::Continue)
  });
  Arc::new(wf)
}

fn halting_flow() -> Arc<Workflow<SubContext, TestError>> {
  let mut wf = Workflow::<SubContext, TestError>::new("halting", [StepSpec::required("stop")]);
  wf.on("stop", |_sub: Shared<SubContext>| async move { Ok::<_, TestError>(Flow::Halt) });
  Arc::new(wf)
}

fn sub_of(ctx: Shared<TestContext>) -> Result<Shared<SubContext>, FlowError> {
  Ok(ctx.read().sub.clone())
}

fn branching(fallback: Option<Flow>) -> Workflow<TestContext, TestError> {
  let mut wf = Workflow::<TestContext, TestError>::new(
    "branching",
    [StepSpec::required("prepare"), StepSpec::required("route"), StepSpec::required("finish")],
  );
  wf.on_boxed("prepare", recording_handler("prepare"));
  wf.on_boxed("finish", recording_handler("finish"));

  let mut branch = wf
    .branch("route")
    .route("upper", |ctx| ctx.read().mode == "upper", upper_flow(), sub_of)
    .route("reverse", |ctx| ctx.read().mode == "reverse", reverse_flow(), sub_of)
    .route("halt", |ctx| ctx.read().mode == "halt", halting_flow(), sub_of);
  if let Some(fallback) = fallback {
    branch = branch.otherwise(fallback);
  }
  branch.finish();
  wf
}

fn context(mode: &str, input: &str) -> Shared<TestContext> {
  Shared::new(TestContext {
    mode: mode.into(),
    sub: Shared::new(SubContext {
      input: input.into(),
      ..Default::default()
    }),
    ..Default::default()
  })
}

#[tokio::test]
#[serial]
async fn matching_route_runs_its_sub_workflow() {
  setup_tracing();
  reset_counters();
  let wf = branching(None);

  let ctx = context("upper", "abc");
  assert_eq!(wf.run(ctx.clone()).await.unwrap(), Outcome::Completed);
  assert_eq!(ctx.read().sub.read().output, "ABC");
  assert_eq!(ctx.read().trail, vec!["prepare", "finish"]);

  let ctx = context("reverse", "abc");
  wf.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().sub.read().output, "cba");
  assert_eq!(SUB_RUNS.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[serial]
async fn first_matching_route_wins() {
  setup_tracing();
  reset_counters();
  let mut wf = Workflow::<TestContext, TestError>::new("first_wins", [StepSpec::required("route")]);
  wf.branch("route")
    .route("always_a", |_| true, upper_flow(), sub_of)
    .route("always_b", |_| true, reverse_flow(), sub_of)
    .finish();

  let ctx = context("", "xy");
  wf.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().sub.read().output, "XY");
  assert_eq!(SUB_RUNS.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn no_match_uses_fallback() {
  setup_tracing();
  reset_counters();

  let ctx = context("unknown", "abc");
  let outcome = branching(None).run(ctx.clone()).await.unwrap();
  assert_eq!(outcome, Outcome::Completed);
  assert_eq!(ctx.read().trail, vec!["prepare", "finish"]);

  let ctx = context("unknown", "abc");
  let outcome = branching(Some(Flow::Halt)).run(ctx.clone()).await.unwrap();
  assert_eq!(outcome, Outcome::Halted);
  assert_eq!(ctx.read().trail, vec!["prepare"]);
  assert_eq!(SUB_RUNS.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[serial]
async fn halted_sub_workflow_halts_parent() {
  setup_tracing();
  let ctx = context("halt", "abc");
  let outcome = branching(None).run(ctx.clone()).await.unwrap();
  assert_eq!(outcome, Outcome::Halted);
  assert_eq!(ctx.read().trail, vec!["prepare"]);
}

#[tokio::test]
#[serial]
async fn failed_projection_reports_branch_step() {
  setup_tracing();
  let mut wf = Workflow::<TestContext, TestError>::new("projection", [StepSpec::required("route")]);
  wf.branch("route")
    .route(
      "broken",
      |_| true,
      upper_flow(),
      |_ctx| Err(FlowError::projection("anywhere", "sub-context unavailable")),
    )
    .finish();

  let err = wf.run(context("", "abc")).await.unwrap_err();
  match err {
    TestError::Flow(msg) => {
      assert!(msg.contains("Projection"), "unexpected error: {msg}");
      assert!(msg.contains("\"route\""), "step name should be the branch step: {msg}");
    }
    other => panic!("expected projection error, got {other:?}"),
  }
}

#[tokio::test]
#[serial]
async fn optional_branch_swallows_route_errors() {
  setup_tracing();
  let mut failing = Workflow::<SubContext, TestError>::new("failing_sub", [StepSpec::required("explode")]);
  failing.on("explode", |_sub: Shared<SubContext>| async move {
    Err::<Flow, TestError>(TestError::Handler("sub failed".into()))
  });

  let mut wf = Workflow::<TestContext, TestError>::new(
    "optional_branch",
    [StepSpec::optional("route"), StepSpec::required("finish")],
  );
  wf.branch("route").route("explode", |_| true, Arc::new(failing), sub_of).finish();
  wf.on_boxed("finish", recording_handler("finish"));

  let ctx = context("", "abc");
  assert_eq!(wf.run(ctx.clone()).await.unwrap(), Outcome::Completed);
  assert_eq!(ctx.read().trail, vec!["finish"]);
}
