//! The one-shot resolution cell shared by a promise and its producers.
//!
//! A cell starts [`State::Pending`] and moves at most once to `Fulfilled` or
//! `Rejected`. Reactions registered while pending are queued and drained, in
//! registration order, by whichever thread wins the transition. The lock is
//! never held while a reaction runs, so reactions may freely register on the
//! same cell or settle other cells.
use crate::context::run_guarded;
use crate::Error;
use parking_lot::Mutex;
use std::fmt;

/// Snapshot of a promise's resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum State<T> {
    Pending,
    Fulfilled(T),
    Rejected(Error),
}

impl<T> State<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, State::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, State::Rejected(_))
    }
}

impl<T: Clone> State<T> {
    /// The settled outcome. Only called where settlement is guaranteed, so a
    /// pending state here means the one-shot invariant is already broken.
    fn outcome(&self) -> Result<T, Error> {
        match self {
            State::Fulfilled(value) => Ok(value.clone()),
            State::Rejected(error) => Err(error.clone()),
            State::Pending => {
                tracing::error!("reaction observed a pending state after settlement");
                unreachable!("promise state is pending during reaction drain")
            }
        }
    }
}

pub(crate) type Reaction<T> = Box<dyn FnOnce(Result<T, Error>) + Send + 'static>;

pub(crate) struct Cell<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    state: State<T>,
    reactions: Vec<Reaction<T>>,
    // Set while the winning settler is still running queued reactions. Late
    // registrations join the queue instead of overtaking earlier ones.
    draining: bool,
}

impl<T: Clone + Send + 'static> Cell<T> {
    pub(crate) fn pending() -> Self {
        Self::with_state(State::Pending)
    }

    pub(crate) fn with_state(state: State<T>) -> Self {
        Cell {
            inner: Mutex::new(Inner {
                state,
                reactions: Vec::new(),
                draining: false,
            }),
        }
    }

    pub(crate) fn state(&self) -> State<T> {
        self.inner.lock().state.clone()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.inner.lock().state.is_pending()
    }

    pub(crate) fn is_fulfilled(&self) -> bool {
        self.inner.lock().state.is_fulfilled()
    }

    pub(crate) fn is_rejected(&self) -> bool {
        self.inner.lock().state.is_rejected()
    }

    /// Returns `true` if this call performed the transition.
    pub(crate) fn fulfill(&self, value: T) -> bool {
        self.settle(State::Fulfilled(value))
    }

    /// Returns `true` if this call performed the transition.
    pub(crate) fn reject(&self, error: Error) -> bool {
        self.settle(State::Rejected(error))
    }

    fn settle(&self, next: State<T>) -> bool {
        debug_assert!(!next.is_pending());
        let mut inner = self.inner.lock();
        if !inner.state.is_pending() {
            tracing::debug!(
                fulfilled = inner.state.is_fulfilled(),
                "ignoring settlement of an already settled promise"
            );
            return false;
        }
        inner.state = next;
        inner.draining = true;
        tracing::trace!(
            fulfilled = inner.state.is_fulfilled(),
            reactions = inner.reactions.len(),
            "promise settled"
        );
        loop {
            let batch = std::mem::take(&mut inner.reactions);
            if batch.is_empty() {
                inner.draining = false;
                return true;
            }
            let outcome = inner.state.outcome();
            drop(inner);
            let mut batch = batch.into_iter().peekable();
            // A panicking reaction must not strand the rest of the batch or
            // leave `draining` set.
            while let Some(reaction) = batch.next() {
                if batch.peek().is_some() {
                    let outcome = outcome.clone();
                    run_guarded("reaction", move || reaction(outcome));
                } else {
                    run_guarded("reaction", move || reaction(outcome));
                    break;
                }
            }
            inner = self.inner.lock();
        }
    }

    /// Queue `reaction` while pending, or run it right away on the calling
    /// thread when the cell has already settled.
    pub(crate) fn register(&self, reaction: Reaction<T>) {
        let mut inner = self.inner.lock();
        if inner.state.is_pending() || inner.draining {
            inner.reactions.push(reaction);
            return;
        }
        let outcome = inner.state.outcome();
        drop(inner);
        run_guarded("reaction", move || reaction(outcome));
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Cell")
            .field("state", &inner.state)
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, State};
    use crate::Error;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> super::Reaction<i32>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &'static str| -> super::Reaction<i32> {
            let sink = sink.clone();
            Box::new(move |outcome: Result<i32, Error>| {
                sink.lock().push(format!("{tag}:{outcome:?}"));
            })
        };
        (log, make)
    }

    #[test]
    fn test_reactions_drain_in_registration_order() {
        let cell = Cell::<i32>::pending();
        let (log, make) = recorder();
        cell.register(make("a"));
        cell.register(make("b"));
        cell.register(make("c"));
        assert!(log.lock().is_empty());

        assert!(cell.fulfill(7));
        assert_eq!(*log.lock(), vec!["a:Ok(7)", "b:Ok(7)", "c:Ok(7)"]);
    }

    #[test]
    fn test_register_after_settlement_runs_immediately() {
        let cell = Cell::with_state(State::Rejected(Error::new("x", 1)));
        let (log, make) = recorder();
        cell.register(make("late"));
        assert_eq!(log.lock().len(), 1);
        assert!(log.lock()[0].starts_with("late:Err("));
    }

    #[test]
    fn test_second_settlement_is_ignored() {
        let cell = Cell::<i32>::pending();
        let (log, make) = recorder();
        cell.register(make("a"));
        assert!(cell.fulfill(1));
        assert!(!cell.fulfill(2));
        assert!(!cell.reject(Error::new("x", 1)));
        assert_eq!(cell.state(), State::Fulfilled(1));
        assert_eq!(*log.lock(), vec!["a:Ok(1)"]);
    }

    #[test]
    fn test_reentrant_register_during_drain_keeps_order() {
        let cell = Arc::new(Cell::<i32>::pending());
        let (log, make) = recorder();
        let inner_cell = cell.clone();
        let nested = make("nested");
        let first = make("first");
        cell.register(Box::new(move |outcome| {
            first(outcome);
            inner_cell.register(nested);
        }));
        cell.register(make("second"));
        cell.fulfill(3);
        assert_eq!(*log.lock(), vec!["first:Ok(3)", "second:Ok(3)", "nested:Ok(3)"]);
    }

    #[test]
    fn test_panicking_reaction_does_not_strand_the_drain() {
        let cell = Cell::<i32>::pending();
        let (log, make) = recorder();
        cell.register(Box::new(|_| panic!("first reaction fails")));
        cell.register(make("second"));
        assert!(cell.fulfill(5));
        assert_eq!(*log.lock(), vec!["second:Ok(5)"]);

        cell.register(make("late"));
        assert_eq!(*log.lock(), vec!["second:Ok(5)", "late:Ok(5)"]);
        assert!(!cell.fulfill(6));
    }

    #[test]
    fn test_panicking_late_reaction_is_contained() {
        let cell = Cell::with_state(State::Fulfilled(1));
        let (log, make) = recorder();
        cell.register(Box::new(|_| panic!("late reaction fails")));
        cell.register(make("after"));
        assert_eq!(*log.lock(), vec!["after:Ok(1)"]);
    }

    #[test]
    fn test_concurrent_settlement_has_one_winner() {
        for _ in 0..50 {
            let cell = Arc::new(Cell::<i32>::pending());
            let (log, make) = recorder();
            for _ in 0..4 {
                cell.register(make("r"));
            }
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let cell = cell.clone();
                    thread::spawn(move || {
                        if i % 2 == 0 {
                            cell.fulfill(i)
                        } else {
                            cell.reject(Error::new("race", i as i64))
                        }
                    })
                })
                .collect();
            let winners = handles
                .into_iter()
                .map(|h| h.join().expect("settling thread panicked"))
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
            let log = log.lock();
            assert_eq!(log.len(), 4);
            assert!(log.iter().all(|entry| entry == &log[0]));
        }
    }

    #[test]
    fn test_concurrent_register_never_loses_a_reaction() {
        for _ in 0..50 {
            let cell = Arc::new(Cell::<i32>::pending());
            let (log, make) = recorder();
            let make = Arc::new(make);
            let registrars: Vec<_> = (0..4)
                .map(|_| {
                    let cell = cell.clone();
                    let make = make.clone();
                    thread::spawn(move || {
                        for _ in 0..25 {
                            cell.register(make("r"));
                        }
                    })
                })
                .collect();
            cell.fulfill(9);
            for handle in registrars {
                handle.join().expect("registering thread panicked");
            }
            assert_eq!(log.lock().len(), 100);
        }
    }
}
