//! `BasicActorRef` (untyped, type-erased) and the `ActorReference`/`Tell`
//! traits that both it and the typed `ActorRef<Msg>` implement. Grounded
//! in the teacher's `actor::actor_ref` module, which is the one place the
//! newer `BasicActorRef`-based generation of the codebase is fully
//! fleshed out.

use std::any::Any;
use std::fmt;

use crate::actor::ActorCell;
use crate::protocol::SystemMsg;
use crate::uri::ActorUri;
use crate::Message;

/// The sender half of every envelope: `None` for fire-and-forget sends
/// with no reply address.
pub type Sender = Option<BasicActorRef>;

/// Capabilities common to any actor handle, typed or not: identity,
/// position in the tree, and the ability to carry a system message.
pub trait ActorReference {
    fn uri(&self) -> &ActorUri;

    fn path(&self) -> &str {
        &self.uri().path
    }

    fn name(&self) -> &str {
        &self.uri().name
    }

    fn parent(&self) -> Option<BasicActorRef>;

    fn children(&self) -> Vec<BasicActorRef>;

    fn is_terminating(&self) -> bool;

    fn sys_tell(&self, msg: SystemMsg);
}

/// Implemented by both `BasicActorRef` and the typed `ActorRef<Msg>`;
/// lets a caller `tell` a concrete message type `T` without knowing
/// whether they're holding the typed or untyped handle.
pub trait Tell<T>: ActorReference + Send + 'static {
    fn tell(&self, msg: T, sender: Sender);

    fn box_clone(&self) -> BoxedTell<T>;
}

pub type BoxedTell<T> = Box<dyn Tell<T>>;

impl<T: 'static> Clone for BoxedTell<T> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl<T> fmt::Debug for BoxedTell<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BoxedTell[{}]", self.uri())
    }
}

/// A type-erased message plus a one-shot flag: set when the message must
/// be taken exactly once (the common case -- user messages forwarded
/// through `BasicActorRef::try_tell`), cleared for messages that may be
/// cloned an unbounded number of times (e.g. broadcast system events).
/// Mirrors the teacher's `AnyMessage`, including its "clone panics once
/// consumed" guard for one-time messages.
pub struct AnyMessage {
    pub one_time: bool,
    msg: Option<Box<dyn Any + Send>>,
}

impl AnyMessage {
    pub fn new<T: Any + Send>(msg: T, one_time: bool) -> Self {
        AnyMessage {
            one_time,
            msg: Some(Box::new(msg)),
        }
    }

    /// Takes the message out, downcasting to `T`. Returns `None` if the
    /// type doesn't match; panics if a one-time message is taken twice.
    pub fn take<T: Any>(&mut self) -> Option<T> {
        let boxed = self.msg.take().expect("AnyMessage already consumed");
        match boxed.downcast::<T>() {
            Ok(v) => Some(*v),
            Err(original) => {
                self.msg = Some(original);
                None
            }
        }
    }
}

impl fmt::Debug for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AnyMessage(one_time={})", self.one_time)
    }
}

#[derive(Debug)]
pub struct AnyEnqueueError;

/// Implemented by a typed cell (`ExtendedCell<Msg>`) so that an untyped
/// `BasicActorRef` can still attempt to deliver a type-erased message,
/// downcasting internally.
pub trait AnySender: Send + Sync {
    fn try_any_enqueue(&self, msg: &mut AnyMessage, sender: Sender) -> Result<(), AnyEnqueueError>;

    fn sys_tell(&self, msg: SystemMsg);
}

/// Untyped, cloneable actor handle. Every `ActorRef<Msg>` can be widened
/// to a `BasicActorRef`; the reverse requires knowing (or successfully
/// downcasting against) `Msg`, which is what `try_tell`/`try_any_enqueue`
/// are for.
#[derive(Clone)]
pub struct BasicActorRef {
    cell: ActorCell,
}

impl BasicActorRef {
    pub fn new(cell: ActorCell) -> Self {
        BasicActorRef { cell }
    }

    pub fn cell(&self) -> &ActorCell {
        &self.cell
    }

    /// Attempts to deliver a concrete message type by boxing it as an
    /// `AnyMessage` and handing it to the cell's type-erased sender. This
    /// is how dead-letter and event-stream plumbing, which only ever see
    /// `BasicActorRef`s, can still deliver typed payloads.
    pub fn try_tell<Msg: Message>(&self, msg: Msg, sender: Sender) -> Result<(), AnyEnqueueError> {
        let mut any = AnyMessage::new(msg, true);
        self.cell.any_sender().try_any_enqueue(&mut any, sender)
    }
}

impl ActorReference for BasicActorRef {
    fn uri(&self) -> &ActorUri {
        self.cell.uri()
    }

    fn parent(&self) -> Option<BasicActorRef> {
        self.cell.parent()
    }

    fn children(&self) -> Vec<BasicActorRef> {
        self.cell.children()
    }

    fn is_terminating(&self) -> bool {
        self.cell.is_terminating()
    }

    fn sys_tell(&self, msg: SystemMsg) {
        self.cell.any_sender().sys_tell(msg);
    }
}

impl fmt::Debug for BasicActorRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BasicActorRef[{}]", self.uri())
    }
}

impl fmt::Display for BasicActorRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

impl PartialEq for BasicActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.uri() == other.uri()
    }
}

impl Eq for BasicActorRef {}

impl std::hash::Hash for BasicActorRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uri().hash(state);
    }
}
