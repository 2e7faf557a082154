use crate::cell::Cell;
use crate::Error;
use std::fmt;
use std::sync::Arc;

/// One-shot capability to fulfill a [`Promise`](crate::Promise).
///
/// Cloning hands the same capability to another producer; only the first
/// settlement across all clones (and the paired [`Rejecter`]) wins.
///
/// # Examples
///
/// ```
/// use promise_then::Promise;
/// use std::thread;
///
/// let (promise, fulfiller, _rejecter) = Promise::<String>::deferred();
/// let task1 = thread::spawn(move || fulfiller.fulfill("🍓".to_owned()));
/// assert!(task1.join().expect("The task1 thread has panicked"));
/// assert_eq!(promise.value().as_deref(), Some("🍓"));
/// ```
pub struct Fulfiller<T> {
    cell: Arc<Cell<T>>,
}

/// One-shot capability to reject a [`Promise`](crate::Promise).
pub struct Rejecter<T> {
    cell: Arc<Cell<T>>,
}

impl<T: Clone + Send + 'static> Fulfiller<T> {
    pub(crate) fn new(cell: Arc<Cell<T>>) -> Self {
        Fulfiller { cell }
    }

    /// Settle the promise with `value`. Returns `false`, and changes nothing,
    /// if the promise was already settled.
    pub fn fulfill(&self, value: T) -> bool {
        self.cell.fulfill(value)
    }

    /// A plain `(value) -> ()` callback for completion-handler style code.
    pub fn into_fn(self) -> impl Fn(T) + Send + Sync + 'static {
        move |value| {
            self.fulfill(value);
        }
    }
}

impl<T: Clone + Send + 'static> Rejecter<T> {
    pub(crate) fn new(cell: Arc<Cell<T>>) -> Self {
        Rejecter { cell }
    }

    /// Settle the promise with `error`. Returns `false`, and changes nothing,
    /// if the promise was already settled.
    pub fn reject(&self, error: Error) -> bool {
        self.cell.reject(error)
    }

    /// A plain `(error) -> ()` callback for completion-handler style code.
    pub fn into_fn(self) -> impl Fn(Error) + Send + Sync + 'static {
        move |error| {
            self.reject(error);
        }
    }
}

impl<T> Clone for Fulfiller<T> {
    fn clone(&self) -> Self {
        Fulfiller {
            cell: self.cell.clone(),
        }
    }
}

impl<T> Clone for Rejecter<T> {
    fn clone(&self) -> Self {
        Rejecter {
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Fulfiller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fulfiller { .. }")
    }
}

impl<T> fmt::Debug for Rejecter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rejecter { .. }")
    }
}

/// Both halves of a deferred promise, kept together by a producer that
/// settles through a single completion point (a delegate, a callback
/// registry, a dialog result).
#[derive(Debug, Clone)]
pub struct Resolver<T> {
    fulfiller: Fulfiller<T>,
    rejecter: Rejecter<T>,
}

impl<T: Clone + Send + 'static> Resolver<T> {
    pub fn new(fulfiller: Fulfiller<T>, rejecter: Rejecter<T>) -> Self {
        Resolver {
            fulfiller,
            rejecter,
        }
    }

    pub fn fulfill(&self, value: T) -> bool {
        self.fulfiller.fulfill(value)
    }

    pub fn reject(&self, error: Error) -> bool {
        self.rejecter.reject(error)
    }

    /// Settle from a `Result`, the shape most completion handlers deliver.
    pub fn resolve(&self, outcome: Result<T, Error>) -> bool {
        match outcome {
            Ok(value) => self.fulfill(value),
            Err(error) => self.reject(error),
        }
    }

    pub fn into_parts(self) -> (Fulfiller<T>, Rejecter<T>) {
        (self.fulfiller, self.rejecter)
    }
}

#[cfg(test)]
mod tests {
    use super::Resolver;
    use crate::{Error, Promise, State};
    use std::thread;

    #[test]
    fn test_deferred_resolve_from_another_thread() {
        let (op, fulfiller, _rejecter) = Promise::<String>::deferred();
        let task1 = thread::spawn(move || fulfiller.fulfill(String::from("🍓")));
        assert!(task1.join().expect("The task1 thread has panicked"));
        assert_eq!(op.state(), State::Fulfilled(String::from("🍓")));
    }

    #[test]
    fn test_deferred_reject() {
        let (op, _fulfiller, rejecter) = Promise::<String>::deferred();
        let task1 = thread::spawn(move || rejecter.reject(Error::new("reject!!", 1)));
        assert!(task1.join().expect("The task1 thread has panicked"));
        assert_eq!(op.error(), Some(Error::new("reject!!", 1)));
    }

    #[test]
    fn test_unresolved_stays_pending() {
        let (op, fulfiller, rejecter) = Promise::<String>::deferred();
        let task1 = thread::spawn(move || {
            std::mem::drop(fulfiller);
            std::mem::drop(rejecter);
        });
        task1.join().expect("The task1 thread has panicked");
        assert!(op.is_pending());
    }

    #[test]
    fn test_resolve_twice_is_a_no_op() {
        let (op, fulfiller, rejecter) = Promise::<i32>::deferred();
        let again = fulfiller.clone();
        assert!(fulfiller.fulfill(1));
        assert!(!again.fulfill(2));
        assert!(!rejecter.reject(Error::new("late", 0)));
        assert_eq!(op.value(), Some(1));
    }

    #[test]
    fn test_callbacks_from_into_fn() {
        let (op, fulfiller, rejecter) = Promise::<u8>::deferred();
        let on_done = fulfiller.into_fn();
        let on_fail = rejecter.into_fn();
        on_fail(Error::new("cb", 9));
        on_done(3);
        assert_eq!(op.error().map(|e| e.code()), Some(9));
    }

    #[test]
    fn test_resolver_settles_from_result() {
        let (op, fulfiller, rejecter) = Promise::<u8>::deferred();
        let resolver = Resolver::new(fulfiller, rejecter);
        assert!(resolver.resolve(Ok(4)));
        assert!(!resolver.resolve(Err(Error::new("late", 1))));
        assert_eq!(op.value(), Some(4));
    }
}
