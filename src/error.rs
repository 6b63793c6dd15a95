//! Error types surfaced to embedding code.
//!
//! Anything that crosses the mailbox boundary (a panic in user behavior, a
//! supervision decision) never shows up here -- it travels the supervisor
//! chain instead. These are the synchronous, caller-observable failures.

use std::fmt;

use thiserror::Error;

use crate::validate::{InvalidName, InvalidPath};

/// Returned by `actor_of` when a new actor cannot be created.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("actor initialization failed")]
    Panicked,
    #[error("invalid actor name: {0}")]
    InvalidName(#[from] InvalidName),
    #[error("an actor at this path already exists: {0}")]
    AlreadyExists(String),
    #[error("the parent actor is terminating or terminated")]
    ParentTerminating,
    #[error("the actor system is shutting down")]
    SystemShuttingDown,
    #[error("actor at {0} cannot join a balancing dispatcher already bound to a different actor class")]
    InvalidActorClassForBalancingDispatcher(String),
}

/// Returned by anything that resolves a textual actor path.
#[derive(Debug, Error)]
pub enum PathError {
    #[error(transparent)]
    Invalid(#[from] InvalidPath),
}

/// Failure to enqueue a message onto a bounded mailbox -- the only way
/// `tell` can fail. Never raised by unbounded mailboxes.
#[derive(Debug, Error)]
pub struct MessageQueueAppendFailure<T> {
    pub msg: T,
    pub reason: &'static str,
}

impl<T> fmt::Display for MessageQueueAppendFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to enqueue message: {}", self.reason)
    }
}

/// Returned when a restart is attempted on an actor that cannot currently
/// accept one (already terminating, or the producer closure failed again
/// while rebuilding the instance).
#[derive(Debug, Error)]
pub enum RestartError {
    #[error("actor is terminating, restart ignored")]
    Terminating,
    #[error("actor failed to restart: producer panicked")]
    ProducerFailed,
}
