//! The control-plane protocol: system messages, system events and the
//! dead-letter envelope. System messages are never exposed to user code
//! directly -- they drive the cell's lifecycle state machine in
//! `actor::actor_cell` and are always processed ahead of user messages
//! within a single mailbox run (see `kernel::mailbox`).

use std::fmt;
use std::sync::Arc;

use crate::actor::BasicActorRef;

/// Why a child is being recreated. Carries the panic payload as a string
/// since the original `Box<dyn Any + Send>` cannot be cloned or, in
/// general, formatted.
#[derive(Clone)]
pub struct Failure(pub Arc<String>);

impl Failure {
    pub fn new(reason: impl Into<String>) -> Self {
        Failure(Arc::new(reason.into()))
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Control-plane messages. Carried on the mailbox's lock-free system
/// stack, drained and reversed to FIFO order ahead of every user-message
/// batch.
#[derive(Clone, Debug)]
pub enum SystemMsg {
    /// Sent once to a freshly created cell: runs `pre_start`, opens the
    /// mailbox and publishes `SystemEvent::ActorCreated`.
    Create,

    /// Sent by a parent after deciding `Directive::Restart` for a failed
    /// child.
    Recreate(Failure),

    /// Increments the suspend count; while > 0 the mailbox processes
    /// system messages only.
    Suspend,

    /// Decrements the suspend count; at zero, resumes user-message
    /// processing.
    Resume,

    /// Begins the termination protocol: stop children, call `post_stop`,
    /// notify watchers, close the mailbox.
    Terminate,

    /// Informs a newly created child who its supervisor is (reserved for
    /// future remote-supervision use; currently a no-op marker since
    /// parentage is established at creation time).
    Supervise(BasicActorRef),

    /// A child has fully terminated; sent to the parent so it can drop
    /// the child from its children map and, if also terminating itself,
    /// continue its own shutdown.
    ChildTerminated(BasicActorRef),

    /// Register interest in `watchee`'s termination.
    Watch {
        watchee: BasicActorRef,
        watcher: BasicActorRef,
    },

    /// Withdraw interest in `watchee`'s termination.
    Unwatch {
        watchee: BasicActorRef,
        watcher: BasicActorRef,
    },

    /// A child's behavior panicked; sent to the parent, which consults
    /// its supervision strategy and responds with `Suspend` +
    /// `Recreate`/`Terminate`/`Resume` (or escalates by failing itself).
    Failed {
        child: BasicActorRef,
        cause: Failure,
    },
}

/// Delivered to watchers as a regular **user** message once a watched
/// actor has fully terminated.
#[derive(Clone, Debug)]
pub struct Terminated(pub BasicActorRef);

/// Delivered to an actor's mailbox as a user message when its configured
/// receive-timeout elapses with no other traffic.
#[derive(Clone, Debug)]
pub struct ReceiveTimeout;

/// Broadcast on the system event stream (and mirrored to the system
/// logger) for lifecycle transitions.
#[derive(Clone, Debug)]
pub enum SystemEvent {
    ActorCreated(BasicActorRef),
    ActorRestarted(BasicActorRef),
    ActorTerminated(BasicActorRef),
}

/// Severity-tagged diagnostic published on the event stream and mirrored
/// through `slog`.
#[derive(Clone, Debug)]
pub enum LogEvent {
    Debug {
        source: String,
        text: String,
    },
    Warning {
        source: String,
        text: String,
    },
    Error {
        source: String,
        text: String,
        cause: Option<Arc<String>>,
    },
}

/// A message that could not be delivered: the recipient was unknown, was
/// already terminated, or rejected it (bounded mailbox full).
#[derive(Clone, Debug)]
pub struct DeadLetter {
    pub msg: String,
    pub sender: Option<BasicActorRef>,
    pub recipient: BasicActorRef,
}
