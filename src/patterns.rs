//! `ask`: send a message and await exactly one reply, built only from
//! primitives the rest of the crate already exposes -- a one-shot
//! temporary actor under the system's temp guardian, and
//! `tokio::time::timeout`. There is no separate request/response
//! tracking table; the temp actor's mailbox *is* the correlation.

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::actor::{Actor, ActorFactoryArgs, ActorRef, BasicActorRef, Context, Props, Sender, Tell};
use crate::error::CreateError;
use crate::system::ActorSystem;
use crate::Message;

#[derive(Debug, Error)]
pub enum AskError {
    #[error("no reply arrived within the timeout")]
    Timeout,
    #[error("could not spawn the temporary reply actor: {0}")]
    Create(#[from] CreateError),
}

struct ReplySlot<Reply: Message>(Mutex<Option<oneshot::Sender<Reply>>>);

struct AskActor<Reply: Message> {
    slot: std::sync::Arc<ReplySlot<Reply>>,
}

impl<Reply: Message> ActorFactoryArgs<std::sync::Arc<ReplySlot<Reply>>> for AskActor<Reply> {
    fn create_args(slot: std::sync::Arc<ReplySlot<Reply>>) -> Self {
        AskActor { slot }
    }
}

impl<Reply: Message> Actor for AskActor<Reply> {
    type Msg = Reply;

    fn recv(&mut self, ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        if let Some(tx) = self.slot.0.lock().take() {
            let _ = tx.send(msg);
        }
        ctx.stop(&ctx.myself());
    }
}

/// Sends `msg` to `target` with a fresh temp actor as its sender, then
/// awaits that actor's first (and only) message as the reply. `target`
/// must reply to whatever sender it was handed -- exactly the contract
/// `recv` already has with `sender: Sender`, nothing ask-specific to
/// learn on the receiving end.
pub async fn ask<M, Reply>(
    system: &ActorSystem,
    target: &impl Tell<M>,
    msg: M,
    timeout: Duration,
) -> Result<Reply, AskError>
where
    M: Message,
    Reply: Message,
{
    let (tx, rx) = oneshot::channel();
    let slot = std::sync::Arc::new(ReplySlot(Mutex::new(Some(tx))));
    let temp: ActorRef<Reply> = system.temp_actor_of(Props::<AskActor<Reply>>::args(slot))?;

    let sender: Sender = Some(BasicActorRef::from(temp));
    target.tell(msg, sender);

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(reply)) => Ok(reply),
        _ => Err(AskError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorFactory;
    use crate::system::ActorSystem;

    #[derive(Clone, Debug)]
    struct Ping;

    #[derive(Clone, Debug)]
    struct Pong;

    struct Ponger;

    impl ActorFactory for Ponger {
        fn create() -> Self {
            Ponger
        }
    }

    impl Actor for Ponger {
        type Msg = Ping;

        fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, sender: Sender) {
            if let Some(sender) = sender {
                let _ = sender.try_tell(Pong, None);
            }
        }
    }

    #[tokio::test]
    async fn ask_returns_the_reply_sent_to_the_temp_actor() {
        let system = ActorSystem::new().expect("system");
        let ponger = system.actor_of(Props::<Ponger>::new(), "ponger").expect("actor_of");

        let reply: Pong = ask(&system, &ponger, Ping, Duration::from_secs(2))
            .await
            .expect("ask should have received a reply");
        let _ = reply;
    }

    struct Silent;

    impl ActorFactory for Silent {
        fn create() -> Self {
            Silent
        }
    }

    impl Actor for Silent {
        type Msg = Ping;

        fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {}
    }

    #[tokio::test]
    async fn ask_times_out_when_nothing_replies() {
        let system = ActorSystem::new().expect("system");
        let silent = system.actor_of(Props::<Silent>::new(), "silent").expect("actor_of");

        let result: Result<Pong, AskError> = ask(&system, &silent, Ping, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(AskError::Timeout)));
    }
}
