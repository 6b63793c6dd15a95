//! Actor identity, state and behavior: the `Actor` trait, the
//! `BasicActorRef`/`ActorRef<Msg>` handle split, the `ActorCell` lifecycle
//! state machine, `Props`/`ActorFactory` construction and the pub/sub
//! `Channel` actor used for the event stream and dead letters.

mod actor;
mod actor_cell;
mod actor_ref;
mod channel;
mod context;
mod props;

pub use self::actor::{Actor, Behavior, BoxActor};
pub use self::actor_cell::{ActorCell, ExtendedCell, RestartStats};
pub use self::actor_ref::{
    ActorReference, AnyEnqueueError, AnyMessage, AnySender, BasicActorRef, BoxedTell, Sender, Tell,
};
pub use self::channel::{
    dead_letter, Channel, ChannelMsg, ChannelRef, Publish, Subscribe, SysTopic, Topic, Unsubscribe,
    All,
};
pub use self::context::Context;
pub use self::props::{ActorFactory, ActorFactoryArgs, BoxActorProd, Props};

pub use crate::uri::{ActorId, ActorUri};

/// Typed, owning handle to an actor. Cloning is cheap (an `Arc` bump);
/// the actor instance itself is never exposed, only its mailbox.
pub struct ActorRef<Msg: crate::Message> {
    pub(crate) cell: ExtendedCell<Msg>,
}

impl<Msg: crate::Message> Clone for ActorRef<Msg> {
    fn clone(&self) -> Self {
        ActorRef {
            cell: self.cell.clone(),
        }
    }
}

impl<Msg: crate::Message> ActorRef<Msg> {
    pub(crate) fn new(cell: ExtendedCell<Msg>) -> Self {
        ActorRef { cell }
    }

    pub fn send_msg(&self, msg: Msg, sender: Sender) {
        self.cell.send_msg(msg, sender);
    }

    pub fn cell(&self) -> &ExtendedCell<Msg> {
        &self.cell
    }
}

impl<Msg: crate::Message> ActorReference for ActorRef<Msg> {
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

    fn sys_tell(&self, msg: crate::protocol::SystemMsg) {
        self.cell.sys_tell(msg);
    }
}

impl<Msg: crate::Message> std::fmt::Debug for ActorRef<Msg> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ActorRef[{}]", self.uri())
    }
}

impl<Msg: crate::Message> std::fmt::Display for ActorRef<Msg> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.uri())
    }
}

impl<Msg: crate::Message> PartialEq for ActorRef<Msg> {
    fn eq(&self, other: &Self) -> bool {
        self.uri() == other.uri()
    }
}

impl<Msg: crate::Message> From<ActorRef<Msg>> for BasicActorRef {
    fn from(r: ActorRef<Msg>) -> Self {
        BasicActorRef::new(r.cell.underlying().clone())
    }
}

impl<T: crate::Message> Tell<T> for ActorRef<T> {
    fn tell(&self, msg: T, sender: Sender) {
        self.send_msg(msg, sender);
    }

    fn box_clone(&self) -> BoxedTell<T> {
        Box::new(self.clone())
    }
}
