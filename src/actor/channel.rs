//! A small pub/sub actor used for both the system event stream and the
//! dead-letter sink, exactly as the teacher's `actor::channel` does:
//! subscribers register per-topic, `Publish` fans out to a topic's
//! subscribers plus anyone subscribed to `All`.

use std::collections::HashMap;

use crate::actor::{Actor, ActorFactoryArgs, ActorReference, BasicActorRef, BoxedTell, Context, Sender};
use crate::protocol::{DeadLetter, SystemEvent};
use crate::Message;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Topic(pub String);

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Topic(s.to_string())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Topic(s)
    }
}

pub struct All;

impl From<All> for Topic {
    fn from(_: All) -> Self {
        Topic("*".to_string())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum SysTopic {
    ActorCreated,
    ActorRestarted,
    ActorTerminated,
}

impl From<SysTopic> for Topic {
    fn from(t: SysTopic) -> Self {
        Topic(
            match t {
                SysTopic::ActorCreated => "actor-created",
                SysTopic::ActorRestarted => "actor-restarted",
                SysTopic::ActorTerminated => "actor-terminated",
            }
            .to_string(),
        )
    }
}

impl From<&SystemEvent> for Topic {
    fn from(evt: &SystemEvent) -> Self {
        match evt {
            SystemEvent::ActorCreated(_) => SysTopic::ActorCreated.into(),
            SystemEvent::ActorRestarted(_) => SysTopic::ActorRestarted.into(),
            SystemEvent::ActorTerminated(_) => SysTopic::ActorTerminated.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Publish<Msg: Message> {
    pub topic: Topic,
    pub msg: Msg,
}

#[derive(Clone, Debug)]
pub struct Subscribe<Msg: Message> {
    pub topic: Topic,
    pub subscriber: BoxedTell<Msg>,
}

#[derive(Clone, Debug)]
pub struct Unsubscribe {
    pub topic: Topic,
    pub subscriber: BasicActorRef,
}

#[derive(Clone, Debug)]
pub enum ChannelMsg<Msg: Message> {
    Publish(Publish<Msg>),
    Subscribe(Subscribe<Msg>),
    Unsubscribe(Unsubscribe),
    UnsubscribeAll(BasicActorRef),
}

impl<Msg: Message> From<Publish<Msg>> for ChannelMsg<Msg> {
    fn from(p: Publish<Msg>) -> Self {
        ChannelMsg::Publish(p)
    }
}

impl<Msg: Message> From<Subscribe<Msg>> for ChannelMsg<Msg> {
    fn from(s: Subscribe<Msg>) -> Self {
        ChannelMsg::Subscribe(s)
    }
}

/// A generic publish/subscribe actor, parameterized over the payload type
/// it carries. The system event stream is `Channel<SystemEvent>`; the
/// dead-letter sink is `Channel<DeadLetter>` wrapped by
/// `DeadLetterChannel` so it never re-publishes the `DeadLetter`s it
/// itself observes (which would loop).
pub struct Channel<Msg: Message> {
    subs: HashMap<Topic, Vec<BoxedTell<Msg>>>,
}

impl<Msg: Message> ActorFactoryArgs<()> for Channel<Msg> {
    fn create_args(_args: ()) -> Self {
        Channel { subs: HashMap::new() }
    }
}

impl<Msg: Message> Actor for Channel<Msg> {
    type Msg = ChannelMsg<Msg>;

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        match msg {
            ChannelMsg::Publish(Publish { topic, msg }) => {
                let all = Topic::from(All);
                if let Some(subs) = self.subs.get(&all) {
                    for sub in subs {
                        sub.tell(msg.clone(), None);
                    }
                }
                if topic != all {
                    if let Some(subs) = self.subs.get(&topic) {
                        for sub in subs {
                            sub.tell(msg.clone(), None);
                        }
                    }
                }
            }
            ChannelMsg::Subscribe(Subscribe { topic, subscriber }) => {
                self.subs.entry(topic).or_insert_with(Vec::new).push(subscriber);
            }
            ChannelMsg::Unsubscribe(Unsubscribe { topic, subscriber }) => {
                if let Some(subs) = self.subs.get_mut(&topic) {
                    subs.retain(|s| s.path() != subscriber.path());
                }
            }
            ChannelMsg::UnsubscribeAll(subscriber) => {
                for subs in self.subs.values_mut() {
                    subs.retain(|s| s.path() != subscriber.path());
                }
            }
        }
    }
}

pub type ChannelRef<Msg> = crate::actor::ActorRef<ChannelMsg<Msg>>;

/// Wraps the dead-letter `Channel<DeadLetter>` so that publishing a
/// `DeadLetter` about a failed send to the channel itself is dropped
/// instead of looping forever. `msg.recipient` being the channel's own
/// path *is* that condition -- publishing this one already failed once --
/// so the guard checks identity rather than pattern-matching the
/// formatted message text.
pub fn dead_letter(msg: DeadLetter, channel: &ChannelRef<DeadLetter>) {
    if msg.recipient.path() == channel.path() {
        return;
    }
    channel.send_msg(
        ChannelMsg::Publish(Publish {
            topic: Topic::from(All),
            msg,
        }),
        None,
    );
}
