// conveyor/src/core/handler.rs

use crate::core::control::Flow;
use crate::core::shared::Shared;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a [`Handler`].
pub type HandlerFuture<E> = Pin<Box<dyn Future<Output = Result<Flow, E>> + Send>>;

/// A step handler: takes a clone of the run's context and resolves to a [`Flow`]
/// signal or the workflow's error type.
///
/// Handlers must drop any lock guard taken on the context before awaiting.
pub type Handler<T, E> = Box<dyn Fn(Shared<T>) -> HandlerFuture<E> + Send + Sync>;
