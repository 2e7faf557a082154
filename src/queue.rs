//! A serial queue uses a multi-producer, single-consumer channel as its
//! backend. Submitters share the `Sender`; one dedicated thread owns the
//! `Receiver` and runs work strictly in submission order.
//!
use crate::context::{run_guarded, Executor, Work};
use crate::ContextError;
use std::{
    sync::mpsc::{channel, Sender},
    thread,
};

#[derive(Debug)]
pub struct SerialQueue {
    name: String,
    sender: Sender<Work>,
}

impl SerialQueue {
    /// Start the worker thread. The thread exits once every handle to the
    /// queue has been dropped and the backlog is empty.
    pub fn spawn(name: impl Into<String>) -> Result<Self, ContextError> {
        let name = name.into();
        let (tx, rx) = channel::<Work>();
        let label = name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                tracing::debug!(queue = %label, "serial queue started");
                for work in rx {
                    run_guarded(&label, work);
                }
                tracing::debug!(queue = %label, "serial queue stopped");
            })
            .map_err(|source| ContextError::SpawnThread {
                name: name.clone(),
                source,
            })?;
        Ok(SerialQueue {
            name,
            sender: tx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Executor for SerialQueue {
    fn submit(&self, work: Work) {
        if self.sender.send(work).is_err() {
            tracing::error!(queue = %self.name, "serial queue worker is gone; dropping work");
        }
    }
}
