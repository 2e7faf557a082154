use crate::cell::{Cell, State};
use crate::deferred::{Fulfiller, Rejecter};
use crate::{Context, Error};
use std::fmt;
use std::sync::Arc;

/// Handle to a value that settles at most once, either fulfilled with a `T`
/// or rejected with an [`Error`].
///
/// Work is composed by attaching continuations with [`then`](Self::then),
/// [`catch`](Self::catch) and [`finally`](Self::finally). Each returns a new
/// downstream promise right away; nothing blocks. Cloning a `Promise` is cheap
/// and every clone observes the same settlement, so several chains may hang
/// off one promise.
///
/// Continuations that produce a new value run on an execution [`Context`].
/// The plain operators use [`Context::default`]; the `_on` variants take one
/// explicitly. Propagating an existing value or error past a continuation
/// that does not apply happens inline on whichever thread settled upstream.
///
/// # Examples
///
/// ```
/// use promise_then::{Context, Error, Promise};
/// use futures::executor::block_on;
///
/// let (promise, fulfiller, _rejecter) = Promise::<i32>::deferred();
/// let answer = promise
///     .then_on(&Context::background(), |x| x + 1)
///     .then(|x| x.to_string());
/// fulfiller.fulfill(41);
/// assert_eq!(block_on(async { answer.await }), Ok("42".to_owned()));
///
/// let recovered = Promise::<i32>::rejected(Error::new("demo", 123))
///     .then(|x| x + 1)
///     .catch(|err| err.code() as i32);
/// assert_eq!(block_on(async { recovered.await }), Ok(123));
/// ```
pub struct Promise<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Create a pending promise and hand its fulfiller and rejecter to `body`,
    /// which runs synchronously before `new` returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_then::Promise;
    /// use std::thread;
    ///
    /// let promise = Promise::new(|fulfiller, _rejecter| {
    ///     thread::spawn(move || fulfiller.fulfill(String::from("done")));
    /// });
    /// # let _ = promise;
    /// ```
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(Fulfiller<T>, Rejecter<T>),
    {
        let (promise, fulfiller, rejecter) = Self::deferred();
        body(fulfiller, rejecter);
        promise
    }

    /// Like [`new`](Self::new), but `body` is submitted to `context` instead
    /// of running on the caller's stack.
    pub fn spawn_on<F>(context: &Context, body: F) -> Self
    where
        F: FnOnce(Fulfiller<T>, Rejecter<T>) + Send + 'static,
    {
        let (promise, fulfiller, rejecter) = Self::deferred();
        context.submit(move || body(fulfiller, rejecter));
        promise
    }

    /// A pending promise together with the only means of settling it.
    pub fn deferred() -> (Self, Fulfiller<T>, Rejecter<T>) {
        let cell = Arc::new(Cell::pending());
        (
            Promise { cell: cell.clone() },
            Fulfiller::new(cell.clone()),
            Rejecter::new(cell),
        )
    }

    pub fn fulfilled(value: T) -> Self {
        Promise {
            cell: Arc::new(Cell::with_state(State::Fulfilled(value))),
        }
    }

    pub fn rejected(error: Error) -> Self {
        Promise {
            cell: Arc::new(Cell::with_state(State::Rejected(error))),
        }
    }

    // These reflect the state at the moment of the call; another thread may
    // settle the promise right after.

    pub fn is_pending(&self) -> bool {
        self.cell.is_pending()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.cell.is_fulfilled()
    }

    pub fn is_rejected(&self) -> bool {
        self.cell.is_rejected()
    }

    pub fn state(&self) -> State<T> {
        self.cell.state()
    }

    pub fn value(&self) -> Option<T> {
        match self.cell.state() {
            State::Fulfilled(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<Error> {
        match self.cell.state() {
            State::Rejected(error) => Some(error),
            _ => None,
        }
    }

    pub(crate) fn register<F>(&self, reaction: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        self.cell.register(Box::new(reaction))
    }

    /// Transform the fulfilled value with `body` on the default context.
    /// A rejection skips `body` and passes straight through.
    pub fn then<U, F>(&self, body: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.then_on(&Context::default(), body)
    }

    pub fn then_on<U, F>(&self, context: &Context, body: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (downstream, fulfiller, rejecter) = Promise::deferred();
        let context = context.clone();
        self.register(move |outcome| match outcome {
            Ok(value) => context.submit(move || {
                fulfiller.fulfill(body(value));
            }),
            Err(error) => {
                rejecter.reject(error);
            }
        });
        downstream
    }

    /// Like [`then`](Self::then), but `body` returns another promise whose
    /// eventual outcome becomes the outcome of the returned promise.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_then::{Context, Promise};
    /// use futures::executor::block_on;
    ///
    /// let lookup = |id: u32| Promise::spawn_on(&Context::background(), move |fulfill, _| {
    ///     fulfill.fulfill(format!("user-{id}"));
    /// });
    /// let name = Promise::fulfilled(7).and_then(lookup);
    /// assert_eq!(block_on(async { name.await }), Ok("user-7".to_owned()));
    /// ```
    pub fn and_then<U, F>(&self, body: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<U> + Send + 'static,
    {
        self.and_then_on(&Context::default(), body)
    }

    pub fn and_then_on<U, F>(&self, context: &Context, body: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<U> + Send + 'static,
    {
        let (downstream, fulfiller, rejecter) = Promise::deferred();
        let context = context.clone();
        self.register(move |outcome| match outcome {
            Ok(value) => context.submit(move || body(value).forward(fulfiller, rejecter)),
            Err(error) => {
                rejecter.reject(error);
            }
        });
        downstream
    }

    /// Like [`then`](Self::then), but `body` may fail: an `Err` rejects the
    /// returned promise instead of fulfilling it.
    pub fn try_then<U, F>(&self, body: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        self.try_then_on(&Context::default(), body)
    }

    pub fn try_then_on<U, F>(&self, context: &Context, body: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        self.and_then_on(context, move |value| Promise::from(body(value)))
    }

    /// Recover from a rejection by turning the error into a value. A fulfilled
    /// value passes through untouched and `body` never runs.
    pub fn catch<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.catch_on(&Context::default(), body)
    }

    pub fn catch_on<F>(&self, context: &Context, body: F) -> Promise<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        let (downstream, fulfiller, _rejecter) = Promise::deferred();
        let context = context.clone();
        self.register(move |outcome| match outcome {
            Ok(value) => {
                fulfiller.fulfill(value);
            }
            Err(error) => context.submit(move || {
                fulfiller.fulfill(body(error));
            }),
        });
        downstream
    }

    /// Recovery that may itself fail: the promise returned by `body` decides
    /// the outcome of the returned promise.
    pub fn or_else<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce(Error) -> Promise<T> + Send + 'static,
    {
        self.or_else_on(&Context::default(), body)
    }

    pub fn or_else_on<F>(&self, context: &Context, body: F) -> Promise<T>
    where
        F: FnOnce(Error) -> Promise<T> + Send + 'static,
    {
        let (downstream, fulfiller, rejecter) = Promise::deferred();
        let context = context.clone();
        self.register(move |outcome| match outcome {
            Ok(value) => {
                fulfiller.fulfill(value);
            }
            Err(error) => context.submit(move || body(error).forward(fulfiller, rejecter)),
        });
        downstream
    }

    /// Observe a rejection without producing a new promise. Ends the chain;
    /// a fulfilled value is ignored.
    pub fn on_rejected<F>(&self, body: F)
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.on_rejected_on(&Context::default(), body)
    }

    pub fn on_rejected_on<F>(&self, context: &Context, body: F)
    where
        F: FnOnce(Error) + Send + 'static,
    {
        let context = context.clone();
        self.register(move |outcome| {
            if let Err(error) = outcome {
                context.submit(move || body(error));
            }
        });
    }

    /// Run `body` once this promise settles, whatever the outcome, then
    /// settle the returned promise with that same outcome. Both happen on the
    /// default context.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_then::{Error, Promise};
    /// use futures::executor::block_on;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use std::sync::Arc;
    ///
    /// let cleaned = Arc::new(AtomicBool::new(false));
    /// let flag = cleaned.clone();
    /// let done = Promise::<u8>::rejected(Error::new("io", 5))
    ///     .finally(move || flag.store(true, Ordering::SeqCst));
    /// assert_eq!(block_on(async { done.await }), Err(Error::new("io", 5)));
    /// assert!(cleaned.load(Ordering::SeqCst));
    /// ```
    pub fn finally<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let (downstream, fulfiller, rejecter) = Promise::deferred();
        let context = Context::default();
        self.register(move |outcome| {
            context.submit(move || {
                body();
                match outcome {
                    Ok(value) => fulfiller.fulfill(value),
                    Err(error) => rejecter.reject(error),
                };
            })
        });
        downstream
    }

    /// Settle `fulfiller`/`rejecter` with whatever this promise settles to.
    fn forward(&self, fulfiller: Fulfiller<T>, rejecter: Rejecter<T>) {
        self.register(move |outcome| {
            match outcome {
                Ok(value) => fulfiller.fulfill(value),
                Err(error) => rejecter.reject(error),
            };
        });
    }
}

impl<T: Clone + Send + 'static> From<Result<T, Error>> for Promise<T> {
    fn from(outcome: Result<T, Error>) -> Self {
        match outcome {
            Ok(value) => Promise::fulfilled(value),
            Err(error) => Promise::rejected(error),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise").field(&self.cell).finish()
    }
}
