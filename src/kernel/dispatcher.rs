//! The three dispatcher variants. Grounded in the teacher's trivial
//! `kernel::Dispatcher` trait (`execute(&mut self, future)`), generalized
//! to run plain `FnOnce` jobs (a mailbox's `run()` call) on top of
//! `crossbeam_channel`'s unbounded MPMC queue rather than a futures
//! executor -- there is no async state inside a mailbox run, so a plain
//! work queue plus a fixed worker pool is both simpler and matches the
//! "no busy-waiting, block on the executor's queue" requirement directly.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender as ChanSender};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::config::DispatcherConfig;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Common capability every dispatcher variant offers: somewhere to hand a
/// scheduled mailbox's `run()` closure.
pub trait Dispatcher: Send + Sync {
    fn execute(&self, job: Job);

    /// Called once when a cell attaches to this dispatcher (construction
    /// time); used by `Balancing` to validate buddy-group membership and
    /// by all variants for liveness bookkeeping.
    fn attach(&self) {
        self.attached().fetch_add(1, Ordering::AcqRel);
    }

    fn detach(&self) {
        self.attached().fetch_sub(1, Ordering::AcqRel);
    }

    fn attached(&self) -> &AtomicUsize;

    fn shutdown(&self);

    /// Called by the provider before attaching a cell of actor type
    /// `actor_type` to this dispatcher. `Standard` and `Pinned` accept
    /// any class; `Balancing` accepts only the first class it sees for
    /// the lifetime of the buddy group.
    fn join_class(&self, _actor_type: TypeId) -> Result<(), ()> {
        Ok(())
    }

    /// The dispatcher's shared mailbox slot, if it keeps one. Only
    /// `Balancing` does -- every cell attached to it shares a single
    /// `MailboxSender<Msg>`, boxed as `Any` here since a dispatcher is
    /// Msg-agnostic; the provider downcasts it back using the concrete
    /// `A::Msg` of whichever cell is attaching, which `join_class` already
    /// guarantees is the same type for the whole group.
    fn shared_mailbox_slot(&self) -> Option<&OnceCell<Box<dyn Any + Send + Sync>>> {
        None
    }

    /// Builds the scheduler closure a shared mailbox should call on every
    /// `Open -> Scheduled` transition. Only meaningful when
    /// `shared_mailbox_slot` returns `Some`.
    fn build_shared_scheduler(&self) -> Arc<dyn Fn() + Send + Sync> {
        unreachable!("build_shared_scheduler is only called on a dispatcher with a shared mailbox slot")
    }

    /// Registers one attached cell's own mailbox-run closure so a
    /// shared-mailbox dispatcher can pick it when its turn comes up.
    /// Standard and Pinned ignore this -- each of their cells already
    /// schedules itself directly.
    fn register_member(&self, _run: Arc<dyn Fn() + Send + Sync>) {}
}

/// Standard dispatcher: a fixed pool of worker threads pulling jobs from
/// one shared unbounded queue. Any worker can run any mailbox.
pub struct StandardDispatcher {
    tx: ChanSender<Job>,
    workers: Vec<JoinHandle<()>>,
    attached: AtomicUsize,
}

impl StandardDispatcher {
    pub fn new(cfg: &DispatcherConfig) -> Arc<Self> {
        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(cfg.pool_size);
        for idx in 0..cfg.pool_size.max(1) {
            workers.push(spawn_worker(format!("hive-rt-dispatcher-{idx}"), rx.clone()));
        }
        Arc::new(StandardDispatcher {
            tx,
            workers,
            attached: AtomicUsize::new(0),
        })
    }
}

impl Dispatcher for StandardDispatcher {
    fn execute(&self, job: Job) {
        // Disconnected only once every worker has exited during shutdown;
        // a job submitted after that is simply dropped, matching the
        // "dispatcher rejects scheduling during shutdown" failure mode.
        let _ = self.tx.send(job);
    }

    fn attached(&self) -> &AtomicUsize {
        &self.attached
    }

    fn shutdown(&self) {
        // Dropping the sender closes the channel once all clones (held
        // by mailboxes that captured `execute` closures) are gone; the
        // worker loop below exits on `Err` from `recv`.
    }
}

impl Drop for StandardDispatcher {
    fn drop(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn spawn_worker(name: String, rx: Receiver<Job>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(name)
        .spawn(move || {
            while let Ok(job) = rx.recv() {
                job();
            }
        })
        .expect("failed to spawn dispatcher worker thread")
}

/// Pinned dispatcher: one dedicated OS thread per attached cell. Used for
/// actors doing blocking work that would otherwise starve the shared
/// pool.
pub struct PinnedDispatcher {
    tx: ChanSender<Job>,
    worker: Option<JoinHandle<()>>,
    attached: AtomicUsize,
}

impl PinnedDispatcher {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (tx, rx) = unbounded::<Job>();
        let worker = spawn_worker(name.into(), rx);
        Arc::new(PinnedDispatcher {
            tx,
            worker: Some(worker),
            attached: AtomicUsize::new(0),
        })
    }
}

impl Dispatcher for PinnedDispatcher {
    fn execute(&self, job: Job) {
        let _ = self.tx.send(job);
    }

    fn attached(&self) -> &AtomicUsize {
        &self.attached
    }

    fn shutdown(&self) {}
}

impl Drop for PinnedDispatcher {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Balancing dispatcher: every cell attached to it is a buddy in one
/// group sharing a *single* mailbox (the provider enforces "same actor
/// class" membership via `join_class` before attaching a cell). Rather
/// than each cell owning a private queue that happens to run on a shared
/// worker pool, the group's messages all land in one `MailboxSender`, and
/// whichever buddy's turn comes up next drains it -- the "whichever
/// worker wins gets the next message" rule applies to which *cell*
/// services a message, not just which thread runs it.
pub struct BalancingDispatcher {
    inner: Arc<StandardDispatcher>,
    class: OnceCell<TypeId>,
    mailbox_slot: OnceCell<Box<dyn Any + Send + Sync>>,
    members: Arc<Mutex<Vec<Arc<dyn Fn() + Send + Sync>>>>,
    next: Arc<AtomicUsize>,
}

impl BalancingDispatcher {
    pub fn new(cfg: &DispatcherConfig) -> Arc<Self> {
        Arc::new(BalancingDispatcher {
            inner: StandardDispatcher::new(cfg),
            class: OnceCell::new(),
            mailbox_slot: OnceCell::new(),
            members: Arc::new(Mutex::new(Vec::new())),
            next: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl Dispatcher for BalancingDispatcher {
    fn execute(&self, job: Job) {
        self.inner.execute(job);
    }

    fn attached(&self) -> &AtomicUsize {
        self.inner.attached()
    }

    fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn join_class(&self, actor_type: TypeId) -> Result<(), ()> {
        match self.class.get() {
            Some(existing) if *existing != actor_type => Err(()),
            Some(_) => Ok(()),
            None => {
                let _ = self.class.set(actor_type);
                Ok(())
            }
        }
    }

    fn shared_mailbox_slot(&self) -> Option<&OnceCell<Box<dyn Any + Send + Sync>>> {
        Some(&self.mailbox_slot)
    }

    fn build_shared_scheduler(&self) -> Arc<dyn Fn() + Send + Sync> {
        let members = self.members.clone();
        let next = self.next.clone();
        let inner = self.inner.clone();
        Arc::new(move || {
            let run = {
                let members = members.lock();
                if members.is_empty() {
                    return;
                }
                let idx = next.fetch_add(1, Ordering::AcqRel) % members.len();
                members[idx].clone()
            };
            inner.execute(Box::new(move || run()));
        })
    }

    fn register_member(&self, run: Arc<dyn Fn() + Send + Sync>) {
        self.members.lock().push(run);
    }
}
