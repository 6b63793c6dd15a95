//! The mailbox: a lock-free user-message queue, a lock-free system-message
//! stack, and a single packed atomic status word tying them together.
//! Grounded in the teacher's `kernel::mailbox` (the `MailboxInner`/
//! `run_mailbox` split and the panic-catching `Sentinel` guard), replacing
//! its futures-mpsc queue with `crossbeam_queue::SegQueue` for the user
//! side and a hand-rolled Treiber stack for the system side, as the
//! system-first ordering invariant requires a LIFO push with an
//! all-at-once FIFO drain rather than an async channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;

use crate::actor::{BasicActorRef, Sender};
use crate::protocol::{DeadLetter, Failure, SystemMsg};
use crate::Message;

// --- status word -----------------------------------------------------

const STATE_MASK: u32 = 0b11;
const STATE_OPEN: u32 = 0;
const STATE_SCHEDULED: u32 = 1;
const STATE_CLOSED: u32 = 2;

const SUSPEND_SHIFT: u32 = 3;
const SUSPEND_FLAG: u32 = 1 << 2;

/// The packed status word described in the data model: two bits of
/// state, one suspension flag, and a 29-bit suspend count, all updated by
/// compare-and-swap.
pub struct StatusWord(AtomicU32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxState {
    Open,
    Scheduled,
    Closed,
}

impl StatusWord {
    pub fn new() -> Self {
        StatusWord(AtomicU32::new(STATE_OPEN))
    }

    fn decode(word: u32) -> (MailboxState, u32) {
        let state = match word & STATE_MASK {
            STATE_OPEN => MailboxState::Open,
            STATE_SCHEDULED => MailboxState::Scheduled,
            _ => MailboxState::Closed,
        };
        (state, word >> SUSPEND_SHIFT)
    }

    pub fn state(&self) -> MailboxState {
        Self::decode(self.0.load(Ordering::Acquire)).0
    }

    pub fn suspend_count(&self) -> u32 {
        Self::decode(self.0.load(Ordering::Acquire)).1
    }

    pub fn is_suspended(&self) -> bool {
        self.0.load(Ordering::Acquire) & SUSPEND_FLAG != 0
    }

    pub fn is_closed(&self) -> bool {
        self.state() == MailboxState::Closed
    }

    /// Try to claim scheduling rights: `Open -> Scheduled`. Returns true
    /// if this caller won the race and must hand the mailbox to a
    /// dispatcher.
    pub fn try_schedule(&self) -> bool {
        loop {
            let current = self.0.load(Ordering::Acquire);
            let (state, _) = Self::decode(current);
            if state != MailboxState::Open {
                return false;
            }
            let next = (current & !STATE_MASK) | STATE_SCHEDULED;
            if self
                .0
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// `Scheduled -> Open`. Called by the worker when a run completes.
    pub fn set_open(&self) {
        loop {
            let current = self.0.load(Ordering::Acquire);
            if current & STATE_MASK != STATE_SCHEDULED {
                return;
            }
            let next = current & !STATE_MASK;
            if self
                .0
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    pub fn close(&self) {
        loop {
            let current = self.0.load(Ordering::Acquire);
            let next = (current & !STATE_MASK) | STATE_CLOSED;
            if self
                .0
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    pub fn suspend(&self) {
        self.0.fetch_add(1 << SUSPEND_SHIFT, Ordering::AcqRel);
        self.0.fetch_or(SUSPEND_FLAG, Ordering::AcqRel);
    }

    /// Decrements the suspend count; clears the flag once it reaches
    /// zero. Returns true once fully resumed.
    pub fn resume(&self) -> bool {
        loop {
            let current = self.0.load(Ordering::Acquire);
            let (_, count) = Self::decode(current);
            if count == 0 {
                return true;
            }
            let new_count = count - 1;
            let mut next = (current & STATE_MASK) | (new_count << SUSPEND_SHIFT);
            if new_count > 0 {
                next |= SUSPEND_FLAG;
            }
            if self
                .0
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return new_count == 0;
            }
        }
    }
}

// --- lock-free LIFO system stack --------------------------------------

struct StackNode {
    msg: SystemMsg,
    next: *mut StackNode,
}

/// A Treiber stack: system messages are pushed with a single
/// compare-and-swap on the head pointer and drained all at once, then
/// reversed, giving FIFO delivery order to `run_mailbox` while keeping
/// the hot push path lock-free.
pub struct SystemStack {
    head: AtomicPtr<StackNode>,
}

unsafe impl Send for SystemStack {}
unsafe impl Sync for SystemStack {}

impl SystemStack {
    pub fn new() -> Self {
        SystemStack {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn push(&self, msg: SystemMsg) {
        let node = Box::into_raw(Box::new(StackNode {
            msg,
            next: ptr::null_mut(),
        }));
        loop {
            let head = self.head.load(Ordering::Acquire);
            unsafe { (*node).next = head };
            if self
                .head
                .compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Atomically takes the whole stack and returns it in FIFO (oldest
    /// first) order.
    pub fn drain_fifo(&self) -> Vec<SystemMsg> {
        let mut head = self.head.swap(ptr::null_mut(), Ordering::AcqRel);
        let mut lifo = Vec::new();
        while !head.is_null() {
            let node = unsafe { Box::from_raw(head) };
            head = node.next;
            lifo.push(node.msg);
        }
        lifo.reverse();
        lifo
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl Drop for SystemStack {
    fn drop(&mut self) {
        self.drain_fifo();
    }
}

// --- envelopes & user queue --------------------------------------------

#[derive(Clone)]
pub struct Envelope<Msg: Message> {
    pub msg: Msg,
    pub sender: Sender,
}

// --- the mailbox itself -------------------------------------------------

/// Shared, cloneable handle used by any thread wanting to push a message
/// (user or system) into this actor's mailbox and, if necessary, hand it
/// to a dispatcher.
pub struct MailboxSender<Msg: Message> {
    queue: Arc<SegQueue<Envelope<Msg>>>,
    sys: Arc<SystemStack>,
    status: Arc<StatusWord>,
    capacity: Option<usize>,
    len: Arc<std::sync::atomic::AtomicUsize>,
    scheduler: Arc<dyn Fn() + Send + Sync>,
}

impl<Msg: Message> Clone for MailboxSender<Msg> {
    fn clone(&self) -> Self {
        MailboxSender {
            queue: self.queue.clone(),
            sys: self.sys.clone(),
            status: self.status.clone(),
            capacity: self.capacity,
            len: self.len.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<Msg: Message> MailboxSender<Msg> {
    fn schedule_if_needed(&self) {
        if self.status.try_schedule() {
            (self.scheduler)();
        }
    }

    pub fn try_enqueue(&self, envelope: Envelope<Msg>) -> Result<(), Envelope<Msg>> {
        if self.status.is_closed() {
            return Err(envelope);
        }

        if let Some(capacity) = self.capacity {
            if self.len.fetch_add(1, Ordering::AcqRel) >= capacity {
                self.len.fetch_sub(1, Ordering::AcqRel);
                return Err(envelope);
            }
        }

        self.queue.push(envelope);
        self.schedule_if_needed();
        Ok(())
    }

    pub fn system_enqueue(&self, msg: SystemMsg) {
        self.sys.push(msg);
        self.schedule_if_needed();
    }

    pub fn suspend(&self) {
        self.status.suspend();
    }

    pub fn resume(&self) {
        if self.status.resume() {
            self.schedule_if_needed();
        }
    }

    pub fn close(&self, recipient: &BasicActorRef, dead_letters: &dyn Fn(DeadLetter)) {
        self.status.close();
        while let Some(envelope) = self.queue.pop() {
            if self.capacity.is_some() {
                self.len.fetch_sub(1, Ordering::AcqRel);
            }
            dead_letters(DeadLetter {
                msg: format!("{:?}", envelope.msg),
                sender: envelope.sender,
                recipient: recipient.clone(),
            });
        }
        for msg in self.sys.drain_fifo() {
            dead_letters(DeadLetter {
                msg: format!("{:?}", msg),
                sender: None,
                recipient: recipient.clone(),
            });
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }
}

/// Constructs a fresh mailbox sender handle. `capacity` bounds the user
/// queue (`None` is the default, unbounded); `scheduler` is called
/// whenever the mailbox transitions `Open -> Scheduled` and is
/// responsible for handing the mailbox to a dispatcher worker.
pub fn mailbox<Msg: Message>(
    capacity: Option<usize>,
    scheduler: Arc<dyn Fn() + Send + Sync>,
) -> MailboxSender<Msg> {
    MailboxSender {
        queue: Arc::new(SegQueue::new()),
        sys: Arc::new(SystemStack::new()),
        status: Arc::new(StatusWord::new()),
        capacity,
        len: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        scheduler,
    }
}

/// Runs one dispatch cycle for a mailbox: drains and processes all
/// pending system messages, then -- if not suspended -- up to `throughput`
/// user messages (cut short early if `throughput_deadline` elapses first),
/// then drains system messages once more (a restart or terminate may have
/// been queued by a handler invoked during this very run), then reopens
/// the mailbox and reschedules if work remains.
///
/// `process_system` and `process_user` are supplied by the actor cell;
/// this function only owns the scheduling/ordering contract, not cell
/// semantics.
pub fn run_mailbox<Msg: Message>(
    sender: &MailboxSender<Msg>,
    throughput: u32,
    throughput_deadline: Option<std::time::Duration>,
    mut process_system: impl FnMut(SystemMsg),
    mut process_user: impl FnMut(Envelope<Msg>),
) {
    if sender.status.is_closed() {
        sender.status.set_open();
        return;
    }

    for msg in sender.sys.drain_fifo() {
        run_guarded(|| process_system(msg));
    }

    if !sender.status.is_suspended() && !sender.status.is_closed() {
        let started = std::time::Instant::now();
        let mut processed = 0;
        while processed < throughput {
            if let Some(deadline) = throughput_deadline {
                if started.elapsed() >= deadline {
                    break;
                }
            }
            let envelope = match sender.queue.pop() {
                Some(e) => e,
                None => break,
            };
            if sender.capacity.is_some() {
                sender.len.fetch_sub(1, Ordering::AcqRel);
            }
            run_guarded(|| process_user(envelope));
            processed += 1;
        }
    }

    for msg in sender.sys.drain_fifo() {
        run_guarded(|| process_system(msg));
    }

    sender.status.set_open();

    let more_work =
        !sender.sys.is_empty() || (!sender.status.is_suspended() && !sender.queue.is_empty());
    if more_work && !sender.status.is_closed() {
        sender.schedule_if_needed();
    }
}

/// Runs `f`, catching a panic so the worker thread survives. Any handler
/// invoked through `process_system`/`process_user` is itself responsible
/// for reporting an actor-behavior panic to the supervisor (see
/// `actor::actor_cell`); this only protects the dispatcher's own thread.
fn run_guarded<T>(f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => Some(v),
        Err(payload) => {
            let _ = Failure::new(panic_message(&payload));
            None
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "actor panicked".to_string()
    }
}
