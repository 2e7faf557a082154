//! One-shot promises with `then` / `catch` / `finally` chaining.
//!
//! A [`Promise`] settles at most once, fulfilled with a value or rejected with
//! an [`Error`]. Producers settle it through a [`Fulfiller`] / [`Rejecter`]
//! pair; consumers attach continuations that each yield a new downstream
//! promise. Continuations run on an execution [`Context`]: the serial
//! foreground queue by default, the background pool, an inline executor, or
//! anything implementing [`Executor`].
//!
//! ```
//! use promise_then::{Error, Promise};
//! use futures::executor::block_on;
//!
//! let (promise, fulfiller, rejecter) = Promise::<u32>::deferred();
//! let message = promise
//!     .then(|n| n * 2)
//!     .catch(|err| err.code() as u32)
//!     .finally(|| println!("settled"));
//!
//! rejecter.reject(Error::new("demo", 7));
//! fulfiller.fulfill(1); // too late, already rejected
//! assert_eq!(block_on(async { message.await }), Ok(7));
//! ```
mod cell;
pub mod config;
pub mod context;
mod deferred;
mod error;
mod promise;
mod queue;
mod settled;

pub use cell::State;
pub use config::{Config, DefaultContext};
pub use context::{Context, Executor, Immediate, Work};
pub use deferred::{Fulfiller, Rejecter, Resolver};
pub use error::{ConfigError, ContextError, Error};
pub use promise::Promise;
pub use queue::SerialQueue;
pub use settled::Settled;
