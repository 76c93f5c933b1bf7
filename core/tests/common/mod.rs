// tests/common/mod.rs
#![allow(dead_code)]

use conveyor::{Flow, FlowError, Handler, Shared};
use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub trail: Vec<String>,
  pub halt_at: Option<String>,
  pub mode: String,
  pub sub: Shared<SubContext>,
}

#[derive(Clone, Debug, Default)]
pub struct SubContext {
  pub input: String,
  pub output: String,
}

#[derive(Clone, Debug, Default)]
pub struct OtherContext {
  pub value: i32,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Workflow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Appends `label` to the trail and halts if `halt_at` names it.
pub fn recording_handler(label: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: Shared<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.trail.push(label.to_string());
      tracing::debug!(target: "test_handlers", label, counter = guard.counter, "handler ran");
      if guard.halt_at.as_deref() == Some(label) {
        return Ok(Flow::Halt);
      }
      Ok(Flow::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: Shared<TestContext>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub static SUB_RUNS: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  SUB_RUNS.store(0, Ordering::SeqCst);
}
