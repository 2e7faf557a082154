use crate::{Error, Promise};
use parking_lot::Mutex;
use std::sync::Arc;
use std::{
    future::{Future, IntoFuture},
    pin::Pin,
    task::{Context, Poll, Waker},
};

/// `std::future::Future` view of a [`Promise`], produced by `.await` or
/// [`IntoFuture::into_future`]. Resolves to the promise's outcome.
///
/// # Examples
///
/// ```
/// use promise_then::Promise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let (promise, fulfiller, _) = Promise::<String>::deferred();
/// let task1 = thread::spawn(move || block_on(async {
///     println!("Received {:?}", promise.await);
/// }));
/// fulfiller.fulfill("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
#[derive(Debug)]
pub struct Settled<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

#[derive(Debug)]
struct Slot<T> {
    outcome: Option<Result<T, Error>>,
    waker: Option<Waker>,
}

impl<T: Clone + Send + 'static> IntoFuture for Promise<T> {
    type Output = Result<T, Error>;
    type IntoFuture = Settled<T>;

    fn into_future(self) -> Self::IntoFuture {
        let slot = Arc::new(Mutex::new(Slot {
            outcome: None,
            waker: None,
        }));
        let sink = slot.clone();
        self.register(move |outcome| {
            let mut slot = sink.lock();
            slot.outcome = Some(outcome);
            if let Some(waker) = slot.waker.take() {
                waker.wake()
            }
        });
        Settled { slot }
    }
}

impl<T> Future for Settled<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        match slot.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Promise};
    use futures::executor::block_on;
    use std::future::IntoFuture;
    use std::thread;

    #[test]
    fn test_await_settled_promise() {
        assert_eq!(block_on(Promise::fulfilled(1).into_future()), Ok(1));
        assert_eq!(
            block_on(Promise::<i32>::rejected(Error::new("x", 2)).into_future()),
            Err(Error::new("x", 2))
        );
    }

    #[test]
    fn test_await_across_threads() {
        let (op, fulfiller, _rejecter) = Promise::<String>::deferred();
        let task1 = thread::spawn(move || block_on(async { op.await }));
        let task2 = thread::spawn(move || fulfiller.fulfill(String::from("🍓")));
        task2.join().expect("The task2 thread has panicked");
        let got = task1.join().expect("The task1 thread has panicked");
        assert_eq!(got.as_deref(), Ok("🍓"));
    }

    #[test]
    fn test_two_waiters_on_one_promise() {
        let (op, fulfiller, _rejecter) = Promise::<u32>::deferred();
        let op_b = op.clone();
        let task1 = thread::spawn(move || block_on(op.into_future()));
        let task2 = thread::spawn(move || block_on(op_b.into_future()));
        fulfiller.fulfill(7);
        assert_eq!(task1.join().expect("The task1 thread has panicked"), Ok(7));
        assert_eq!(task2.join().expect("The task2 thread has panicked"), Ok(7));
    }
}
