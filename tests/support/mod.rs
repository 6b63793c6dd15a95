//! Shared scaffolding for the integration suites: a countdown latch for
//! asserting timing without guessing at sleeps, and a generic actor that
//! forwards every message it receives to a `crossbeam_channel`. Stands in
//! for the async `riker_testkit` probes the original test suite used --
//! this runtime has no executor for them to hook into.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender as ChanSender};

use hive_rt::actors::*;

/// Blocks until `n` calls to `count_down` have happened, or a timeout
/// elapses. `std::sync::mpsc`'s `Sender` would do for a one-shot signal,
/// but several of the scenarios below need to count down from more than
/// one and wait from a thread that isn't the one counting.
#[derive(Debug)]
pub struct Latch {
    remaining: Mutex<u32>,
    cond: Condvar,
}

impl Latch {
    pub fn new(n: u32) -> Arc<Self> {
        Arc::new(Latch {
            remaining: Mutex::new(n),
            cond: Condvar::new(),
        })
    }

    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
        }
        if *remaining == 0 {
            self.cond.notify_all();
        }
    }

    /// Returns `true` if the latch reached zero before `timeout` elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let remaining = self.remaining.lock().unwrap();
        if *remaining == 0 {
            return true;
        }
        let (_guard, result) = self
            .cond
            .wait_timeout_while(remaining, timeout, |r| *r > 0)
            .unwrap();
        !result.timed_out()
    }
}

/// An actor whose entire behavior is forwarding each message, verbatim, to
/// a channel a test can block on.
pub struct Probe<Msg: Message> {
    tx: ChanSender<Msg>,
}

impl<Msg: Message> ActorFactoryArgs<ChanSender<Msg>> for Probe<Msg> {
    fn create_args(tx: ChanSender<Msg>) -> Self {
        Probe { tx }
    }
}

impl<Msg: Message> Actor for Probe<Msg> {
    type Msg = Msg;

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        let _ = self.tx.send(msg);
    }
}

pub fn probe<Msg: Message>() -> (ChanSender<Msg>, Receiver<Msg>) {
    unbounded()
}
