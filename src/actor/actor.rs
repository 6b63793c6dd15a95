use crate::actor::{Context, Sender};
use crate::protocol::Failure;
use crate::supervision::Strategy;
use crate::Message;

/// Everything a user actor implements. Mirrors the shape of the teacher's
/// `Actor` trait: a single required `recv`, a handful of lifecycle hooks
/// with do-nothing defaults, and an overridable supervision strategy.
pub trait Actor: Send + 'static {
    type Msg: Message;

    /// Called once before the actor starts processing user messages.
    fn pre_start(&mut self, _ctx: &Context<Self::Msg>) {}

    /// Called once after `pre_start` succeeds and the mailbox has opened.
    fn post_start(&mut self, _ctx: &Context<Self::Msg>) {}

    /// Called on the dying instance before it is replaced, with the
    /// failure that caused the restart.
    fn pre_restart(&mut self, _ctx: &Context<Self::Msg>, _failure: &Failure) {}

    /// Called on the freshly constructed instance right after a restart.
    fn post_restart(&mut self, _ctx: &Context<Self::Msg>, _failure: &Failure) {}

    /// Called once, after children have stopped, as the final step before
    /// the mailbox closes.
    fn post_stop(&mut self, _ctx: &Context<Self::Msg>) {}

    /// The supervision strategy applied to failures reported by this
    /// actor's children. Defaults to `OneForOne` with unlimited retries,
    /// matching the teacher's default.
    fn supervisor_strategy(&self) -> Strategy {
        Strategy::default()
    }

    /// Handle one user message.
    fn recv(&mut self, ctx: &Context<Self::Msg>, msg: Self::Msg, sender: Sender);
}

/// A `Box<dyn Actor<Msg = Msg>>`, the form in which a `Props` stores and
/// hands back the instance it produces.
pub type BoxActor<Msg> = Box<dyn Actor<Msg = Msg>>;

/// A single hotswapped behavior: a boxed closure capturing whatever state
/// `context.become_(...)` needs. Pushed/popped on the cell's behavior
/// stack; the bottom of the stack is always the actor's own `recv`.
pub type Behavior<Msg> = Box<dyn FnMut(&Context<Msg>, Msg, Sender) + Send>;
