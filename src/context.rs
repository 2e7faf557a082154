//! Execution contexts: where continuations run.
//!
//! A [`Context`] is a cheap handle around anything implementing [`Executor`].
//! Three process-wide contexts are built in: a serial foreground queue, a
//! concurrent background pool and an inline "immediate" executor.
use crate::config::{Config, DefaultContext};
use crate::queue::SerialQueue;
use crate::ContextError;
use futures::executor::ThreadPool;
use once_cell::sync::Lazy;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs submitted work, somewhere, eventually.
///
/// Submission is fire-and-forget. Implementations decide ordering; nothing is
/// guaranteed between work submitted to two different executors.
pub trait Executor: Send + Sync {
    fn submit(&self, work: Work);
}

/// Runs work inline on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Executor for Immediate {
    fn submit(&self, work: Work) {
        run_guarded("immediate", work)
    }
}

impl Executor for ThreadPool {
    fn submit(&self, work: Work) {
        self.spawn_ok(async move { run_guarded("background", work) });
    }
}

/// Run one work item, containing any panic so the worker thread survives.
pub(crate) fn run_guarded(context: &str, work: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
        tracing::error!(
            context,
            panic = panic_message(payload.as_ref()),
            "work item panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

static IMMEDIATE: Lazy<Context> = Lazy::new(|| Context::named("immediate", Immediate));

static FOREGROUND: Lazy<Context> = Lazy::new(|| {
    let name = format!("{}-foreground", Config::current().thread_name_prefix());
    match SerialQueue::spawn(name) {
        Ok(queue) => Context::named("foreground", queue),
        Err(err) => {
            tracing::warn!(error = %err, "foreground queue unavailable, running inline");
            IMMEDIATE.clone()
        }
    }
});

static BACKGROUND: Lazy<Context> = Lazy::new(|| {
    let config = Config::current();
    let mut builder = ThreadPool::builder();
    builder.name_prefix(format!("{}-background-", config.thread_name_prefix()));
    if let Some(size) = config.background_threads() {
        builder.pool_size(size);
    }
    match builder.create() {
        Ok(pool) => Context::named("background", pool),
        Err(err) => {
            tracing::warn!(error = %err, "background pool unavailable, using foreground");
            FOREGROUND.clone()
        }
    }
});

/// Handle to an [`Executor`].
///
/// # Examples
///
/// ```
/// use promise_then::Context;
/// use std::sync::mpsc::channel;
///
/// let (tx, rx) = channel();
/// Context::background().submit(move || tx.send(5).unwrap());
/// assert_eq!(rx.recv().unwrap(), 5);
/// ```
#[derive(Clone)]
pub struct Context {
    name: &'static str,
    executor: Arc<dyn Executor>,
}

impl Context {
    pub fn new(executor: impl Executor + 'static) -> Self {
        Self::named("custom", executor)
    }

    fn named(name: &'static str, executor: impl Executor + 'static) -> Self {
        Context {
            name,
            executor: Arc::new(executor),
        }
    }

    /// The process-wide serial queue. Work runs one item at a time, in
    /// submission order, on a single dedicated thread.
    pub fn foreground() -> Self {
        FOREGROUND.clone()
    }

    /// The process-wide concurrent pool.
    pub fn background() -> Self {
        BACKGROUND.clone()
    }

    pub fn immediate() -> Self {
        IMMEDIATE.clone()
    }

    /// A private serial queue on a new thread called `name`.
    pub fn serial(name: impl Into<String>) -> Result<Self, ContextError> {
        Ok(Self::named("serial", SerialQueue::spawn(name)?))
    }

    /// A private pool of `size` threads.
    pub fn thread_pool(size: usize) -> Result<Self, ContextError> {
        let pool = ThreadPool::builder()
            .pool_size(size)
            .create()
            .map_err(ContextError::ThreadPool)?;
        Ok(Self::named("thread-pool", pool))
    }

    pub fn submit(&self, work: impl FnOnce() + Send + 'static) {
        self.executor.submit(Box::new(work))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.executor, &other.executor)
    }
}

impl Default for Context {
    /// The context used by the chaining operators when none is given.
    fn default() -> Self {
        match Config::current().default_context() {
            DefaultContext::Foreground => Context::foreground(),
            DefaultContext::Background => Context::background(),
            DefaultContext::Immediate => Context::immediate(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.name).finish()
    }
}

impl<E: Executor + 'static> From<Arc<E>> for Context {
    fn from(executor: Arc<E>) -> Self {
        Context {
            name: "custom",
            executor,
        }
    }
}
