//! The per-actor execution context passed to every `Actor` method:
//! identity, parent access, death-watch, hotswap (`become`/`unbecome`)
//! and child creation. Grounded in the teacher's `actor_cell::Context`,
//! generalized to hold a typed `ActorRef<Msg>` instead of the old
//! generic-`Msg` system handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::actor::actor::Behavior;
use crate::actor::{ActorFactoryArgs, ActorReference, ActorRef, BasicActorRef, Props, Sender};
use crate::error::CreateError;
use crate::protocol::ReceiveTimeout;
use crate::system::ActorSystem;
use crate::Message;

type TimeoutJob = (Duration, Arc<dyn Fn() + Send + Sync>);

pub struct Context<Msg: Message> {
    pub myself: ActorRef<Msg>,
    system: ActorSystem,
    behavior_stack: Mutex<Vec<Behavior<Msg>>>,
    receive_timeout: Mutex<Option<TimeoutJob>>,
    timeout_generation: AtomicU64,
}

impl<Msg: Message> Context<Msg> {
    pub fn new(myself: ActorRef<Msg>, system: ActorSystem) -> Self {
        Context {
            myself,
            system,
            behavior_stack: Mutex::new(Vec::new()),
            receive_timeout: Mutex::new(None),
            timeout_generation: AtomicU64::new(0),
        }
    }

    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    pub fn myself(&self) -> ActorRef<Msg> {
        self.myself.clone()
    }

    pub fn parent(&self) -> Option<BasicActorRef> {
        self.myself.cell().parent()
    }

    /// Creates a child of this actor. Equivalent to
    /// `system.actor_of(...)` but rooted at `self` instead of the user
    /// guardian.
    pub fn actor_of<A>(&self, props: Props<A>, name: &str) -> Result<ActorRef<A::Msg>, CreateError>
    where
        A: crate::actor::Actor,
    {
        let parent: BasicActorRef = self.myself.clone().into();
        self.system.provider().create_actor(props, name, &parent, &self.system)
    }

    pub fn actor_of_args<A, Args>(
        &self,
        args: Args,
        name: &str,
    ) -> Result<ActorRef<A::Msg>, CreateError>
    where
        A: crate::actor::Actor + ActorFactoryArgs<Args>,
        Args: Clone + Send + Sync + 'static,
    {
        self.actor_of(Props::<A>::args(args), name)
    }

    pub fn watch(&self, subject: &BasicActorRef) {
        self.myself.cell().underlying().watch(subject.clone());
    }

    pub fn unwatch(&self, subject: &BasicActorRef) {
        self.myself.cell().underlying().unwatch(subject);
    }

    pub fn stop(&self, subject: &impl ActorReference) {
        subject.sys_tell(crate::protocol::SystemMsg::Terminate);
    }

    /// Re-sends `msg` to `target`, keeping `sender` as the envelope's
    /// sender instead of substituting `self.myself()`. Only meaningful
    /// from inside a `recv`, passing along the `sender` that call
    /// received, so a reply from `target` goes to the original caller
    /// rather than back to this actor.
    pub fn forward<M: Message>(&self, target: &ActorRef<M>, msg: M, sender: Sender) {
        target.send_msg(msg, sender);
    }

    /// Pushes a new behavior onto the hotswap stack. While any behavior
    /// is pushed, it -- not the actor's own `recv` -- handles incoming
    /// user messages.
    pub fn become_(&self, behavior: Behavior<Msg>) {
        self.behavior_stack.lock().push(behavior);
    }

    pub fn unbecome(&self) {
        self.behavior_stack.lock().pop();
    }

    /// If a behavior has been pushed via `become_`, runs it and returns
    /// `true`; otherwise returns `false` so the caller falls through to
    /// the actor's own `recv`.
    pub(crate) fn invoke_hotswap(&self, msg: Msg, sender: Sender) -> bool {
        let mut stack = self.behavior_stack.lock();
        match stack.last_mut() {
            Some(top) => {
                top(self, msg, sender);
                true
            }
            None => false,
        }
    }

    /// Arms a receive-timeout: if no message arrives within `duration`,
    /// `ReceiveTimeout` is delivered as a user message. Any subsequently
    /// processed message (including another `ReceiveTimeout`) invalidates
    /// the pending timer; call `cancel_receive_timeout` to disarm
    /// permanently.
    pub fn set_receive_timeout(&self, duration: Duration)
    where
        Msg: From<ReceiveTimeout>,
    {
        let myself = self.myself.clone();
        let deliver: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            myself.send_msg(Msg::from(ReceiveTimeout), None);
        });
        *self.receive_timeout.lock() = Some((duration, deliver));
    }

    pub fn cancel_receive_timeout(&self) {
        *self.receive_timeout.lock() = None;
    }

    pub(crate) fn receive_timeout_job(&self) -> Option<TimeoutJob> {
        self.receive_timeout.lock().clone()
    }

    pub(crate) fn bump_generation(&self) -> u64 {
        self.timeout_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.timeout_generation.load(Ordering::SeqCst)
    }
}
