//! `ActorCell` (untyped parent/child/watch bookkeeping, shared by every
//! actor regardless of its message type) and `ExtendedCell<Msg>` (the
//! typed wrapper that actually owns a mailbox). Grounded in the teacher's
//! split between `actor::actor_cell::ActorCell` and the `ExtendedCell`
//! referenced throughout its newer-generation modules, generalized so
//! that `ActorCell` carries the death-watch sets and per-child restart
//! stats the distilled spec requires.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::actor::{ActorReference, AnyEnqueueError, AnyMessage, AnySender, BasicActorRef, Sender};
use crate::kernel::Dispatcher;
use crate::kernel::{Envelope, MailboxSender};
use crate::protocol::{DeadLetter, SystemMsg};
use crate::supervision::RestartStatsState;
use crate::uri::ActorUri;
use crate::Message;

pub use crate::supervision::RestartStatsState as RestartStats;

struct ActorCellInner {
    uri: ActorUri,
    parent: Option<BasicActorRef>,
    children: RwLock<Vec<BasicActorRef>>,
    watching: RwLock<HashSet<BasicActorRef>>,
    watched_by: RwLock<HashSet<BasicActorRef>>,
    restart_stats: RwLock<HashMap<String, RestartStatsState>>,
    is_terminating: AtomicBool,
    any_sender: OnceCell<Arc<dyn AnySender>>,
}

/// Untyped per-actor bookkeeping: identity, tree position, death-watch
/// sets and the restart accounting a parent keeps about each of its
/// children. Cheap to clone (one `Arc` bump); the same `ActorCell` value
/// backs both a `BasicActorRef` and the typed `ExtendedCell` built on
/// top of it.
#[derive(Clone)]
pub struct ActorCell {
    inner: Arc<ActorCellInner>,
}

impl ActorCell {
    /// Builds a cell with no sender attached yet. The creator must call
    /// `set_any_sender` once the typed `ExtendedCell` wrapping this cell
    /// exists -- the two are circular (the cell's sender is itself typed
    /// on top of the cell) so this is unavoidably a two-step construction.
    pub fn new(uri: ActorUri, parent: Option<BasicActorRef>) -> Self {
        ActorCell {
            inner: Arc::new(ActorCellInner {
                uri,
                parent,
                children: RwLock::new(Vec::new()),
                watching: RwLock::new(HashSet::new()),
                watched_by: RwLock::new(HashSet::new()),
                restart_stats: RwLock::new(HashMap::new()),
                is_terminating: AtomicBool::new(false),
                any_sender: OnceCell::new(),
            }),
        }
    }

    pub fn set_any_sender(&self, any_sender: Arc<dyn AnySender>) {
        let _ = self.inner.any_sender.set(any_sender);
    }

    pub fn uri(&self) -> &ActorUri {
        &self.inner.uri
    }

    pub fn parent(&self) -> Option<BasicActorRef> {
        self.inner.parent.clone()
    }

    pub fn children(&self) -> Vec<BasicActorRef> {
        self.inner.children.read().clone()
    }

    pub fn any_sender(&self) -> &Arc<dyn AnySender> {
        self.inner
            .any_sender
            .get()
            .expect("ActorCell::any_sender read before set_any_sender")
    }

    pub fn is_terminating(&self) -> bool {
        self.inner.is_terminating.load(Ordering::Acquire)
    }

    pub fn set_terminating(&self) {
        self.inner.is_terminating.store(true, Ordering::Release);
    }

    pub fn add_child(&self, child: BasicActorRef) {
        self.inner.children.write().push(child);
    }

    pub fn remove_child(&self, path: &str) {
        self.inner.children.write().retain(|c| c.path() != path);
        self.inner.restart_stats.write().remove(path);
    }

    pub fn has_children(&self) -> bool {
        !self.inner.children.read().is_empty()
    }

    pub fn restart_stats_for(&self, path: &str) -> RestartStatsState {
        let mut stats = self.inner.restart_stats.write();
        std::mem::take(stats.entry(path.to_string()).or_insert_with(RestartStatsState::default))
    }

    pub fn put_restart_stats(&self, path: &str, state: RestartStatsState) {
        self.inner.restart_stats.write().insert(path.to_string(), state);
    }

    pub fn watch(&self, subject: BasicActorRef) {
        let newly_watching = self.inner.watching.write().insert(subject.clone());
        if newly_watching {
            subject.sys_tell(SystemMsg::Watch {
                watchee: subject.clone(),
                watcher: self.as_ref(),
            });
        }
    }

    pub fn unwatch(&self, subject: &BasicActorRef) {
        if self.inner.watching.write().remove(subject) {
            subject.sys_tell(SystemMsg::Unwatch {
                watchee: subject.clone(),
                watcher: self.as_ref(),
            });
        }
    }

    pub fn record_watcher(&self, watcher: BasicActorRef) {
        self.inner.watched_by.write().insert(watcher);
    }

    pub fn forget_watcher(&self, watcher: &BasicActorRef) {
        self.inner.watched_by.write().remove(watcher);
    }

    pub fn watchers(&self) -> Vec<BasicActorRef> {
        self.inner.watched_by.read().iter().cloned().collect()
    }

    fn as_ref(&self) -> BasicActorRef {
        BasicActorRef::new(self.clone())
    }
}

/// Typed wrapper around `ActorCell` that owns the mailbox and the
/// dispatcher handle used to schedule it. One `ActorRef<Msg>` per cell
/// ever exists, though it may be cloned freely.
pub struct ExtendedCell<Msg: Message> {
    underlying: ActorCell,
    mailbox: MailboxSender<Msg>,
    dispatcher: Arc<dyn Dispatcher>,
    dead_letters: Arc<dyn Fn(DeadLetter) + Send + Sync>,
    push_timeout: Duration,
}

impl<Msg: Message> Clone for ExtendedCell<Msg> {
    fn clone(&self) -> Self {
        ExtendedCell {
            underlying: self.underlying.clone(),
            mailbox: self.mailbox.clone(),
            dispatcher: self.dispatcher.clone(),
            dead_letters: self.dead_letters.clone(),
            push_timeout: self.push_timeout,
        }
    }
}

impl<Msg: Message> ExtendedCell<Msg> {
    pub fn new(
        underlying: ActorCell,
        mailbox: MailboxSender<Msg>,
        dispatcher: Arc<dyn Dispatcher>,
        dead_letters: Arc<dyn Fn(DeadLetter) + Send + Sync>,
        push_timeout: Duration,
    ) -> Self {
        dispatcher.attach();
        ExtendedCell {
            underlying,
            mailbox,
            dispatcher,
            dead_letters,
            push_timeout,
        }
    }

    pub fn underlying(&self) -> &ActorCell {
        &self.underlying
    }

    pub fn uri(&self) -> &ActorUri {
        self.underlying.uri()
    }

    pub fn parent(&self) -> Option<BasicActorRef> {
        self.underlying.parent()
    }

    pub fn children(&self) -> Vec<BasicActorRef> {
        self.underlying.children()
    }

    pub fn is_terminating(&self) -> bool {
        self.underlying.is_terminating()
    }

    pub fn mailbox(&self) -> &MailboxSender<Msg> {
        &self.mailbox
    }

    /// Enqueues `msg`. Against a bounded mailbox that is momentarily full
    /// (not closed), this retries until `push_timeout` elapses before
    /// giving up; a closed mailbox fails immediately. Either way, a
    /// failure is routed to dead letters rather than returned to the
    /// caller -- `tell` never blocks the caller on backpressure.
    pub fn send_msg(&self, msg: Msg, sender: Sender) {
        let mut envelope = Envelope { msg, sender: sender.clone() };
        let deadline = Instant::now() + self.push_timeout;
        loop {
            match self.mailbox.try_enqueue(envelope) {
                Ok(()) => return,
                Err(rejected) => {
                    if self.mailbox.is_closed() || Instant::now() >= deadline {
                        (self.dead_letters)(DeadLetter {
                            msg: "<mailbox full or closed>".to_string(),
                            sender,
                            recipient: BasicActorRef::new(self.underlying.clone()),
                        });
                        return;
                    }
                    envelope = rejected;
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    pub fn sys_tell(&self, msg: SystemMsg) {
        self.mailbox.system_enqueue(msg);
    }

    pub fn close(&self) {
        let recipient = BasicActorRef::new(self.underlying.clone());
        let dead_letters = self.dead_letters.clone();
        self.mailbox.close(&recipient, &move |dl| (dead_letters)(dl));
        self.dispatcher.detach();
    }
}

impl<Msg: Message> AnySender for ExtendedCell<Msg> {
    fn try_any_enqueue(&self, msg: &mut AnyMessage, sender: Sender) -> Result<(), AnyEnqueueError> {
        match msg.take::<Msg>() {
            Some(concrete) => {
                self.send_msg(concrete, sender);
                Ok(())
            }
            None => Err(AnyEnqueueError),
        }
    }

    fn sys_tell(&self, msg: SystemMsg) {
        ExtendedCell::sys_tell(self, msg);
    }
}
