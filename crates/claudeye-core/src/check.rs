//! Check functions, conditions and scope tags shared by every registry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::context::EvalContext;

/// Which kind of session an item applies to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvalScope {
    /// Top-level sessions only.
    #[default]
    Session,
    /// Nested sub-agent sessions only.
    Subagent,
    /// Both.
    Both,
}

impl EvalScope {
    pub fn applies_to_session(self) -> bool {
        matches!(self, EvalScope::Session | EvalScope::Both)
    }

    pub fn applies_to_subagent(self) -> bool {
        matches!(self, EvalScope::Subagent | EvalScope::Both)
    }
}

/// Boxed future returned by a check.
pub type CheckFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

type DynCheck<T> = dyn Fn(Arc<EvalContext>) -> CheckFuture<T> + Send + Sync;

/// A shareable, possibly asynchronous function run against a context.
///
/// Errors are reported through `anyhow::Error`; the error's display string
/// becomes the item's error message.
pub struct CheckFn<T> {
    inner: Arc<DynCheck<T>>,
}

/// A gate deciding whether an item (or a whole batch) runs.
pub type Condition = CheckFn<bool>;

impl<T: Send + 'static> CheckFn<T> {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<EvalContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |ctx: Arc<EvalContext>| -> CheckFuture<T> {
                Box::pin(f(ctx))
            }),
        }
    }

    /// Wrap a synchronous closure. It still runs on the item's own task.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(&EvalContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |ctx: Arc<EvalContext>| -> CheckFuture<T> {
                let out = f(&ctx);
                Box::pin(futures::future::ready(out))
            }),
        }
    }

    /// A check that always yields a clone of `value`.
    pub fn constant(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_sync(move |_| Ok(value.clone()))
    }

    pub(crate) fn call(&self, ctx: Arc<EvalContext>) -> CheckFuture<T> {
        (self.inner)(ctx)
    }
}

impl<T> Clone for CheckFn<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for CheckFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CheckFn(..)")
    }
}

impl<T> CheckFn<T> {
    /// Whether two handles wrap the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
