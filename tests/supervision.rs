//! Supervision: fault tolerance under panics (S4), surviving repeated
//! panics without poisoning the actor's lock (S5), and that `Stop`,
//! `Escalate` and `AllForOne` each produce the tree shape their directive
//! promises.

mod support;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender as ChanSender;
use hive_rt::actors::*;

#[derive(Clone, Debug)]
enum FaultMsg {
    Reply(String, ChanSender<String>),
    Throw(String),
}

struct PanicActor {
    restarts: Arc<AtomicU32>,
}

impl ActorFactoryArgs<Arc<AtomicU32>> for PanicActor {
    fn create_args(restarts: Arc<AtomicU32>) -> Self {
        PanicActor { restarts }
    }
}

impl Actor for PanicActor {
    type Msg = FaultMsg;

    fn post_restart(&mut self, _ctx: &Context<Self::Msg>, _failure: &Failure) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        match msg {
            FaultMsg::Reply(text, tx) => {
                let _ = tx.send(text);
            }
            FaultMsg::Throw(reason) => panic!("{}", reason),
        }
    }
}

#[test]
fn fault_tolerance_under_exception() {
    let system = ActorSystem::new().expect("system");
    let restarts = Arc::new(AtomicU32::new(0));
    let actor = system
        .actor_of(Props::<PanicActor>::args(restarts.clone()), "fault-actor")
        .expect("actor_of");

    let (tx, rx) = crossbeam_channel::unbounded::<String>();
    actor.send_msg(FaultMsg::Reply("foo".into(), tx.clone()), None);
    actor.send_msg(FaultMsg::Reply("bar".into(), tx.clone()), None);
    actor.send_msg(FaultMsg::Throw("IndexOutOfBounds".into()), None);
    actor.send_msg(FaultMsg::Reply("foo2".into(), tx.clone()), None);
    actor.send_msg(FaultMsg::Throw("Remote".into()), None);
    actor.send_msg(FaultMsg::Reply("bar2".into(), tx.clone()), None);

    let mut replies = Vec::new();
    for _ in 0..4 {
        replies.push(rx.recv_timeout(Duration::from_secs(2)).expect("missing reply"));
    }
    assert_eq!(replies, vec!["foo", "bar", "foo2", "bar2"]);
    assert!(
        rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "no reply expected for either throw"
    );
    assert_eq!(restarts.load(Ordering::SeqCst), 2);
}

#[test]
fn actor_keeps_serving_messages_across_repeated_panics() {
    let system = ActorSystem::new().expect("system");
    let restarts = Arc::new(AtomicU32::new(0));
    let actor = system
        .actor_of(Props::<PanicActor>::args(restarts.clone()), "repeatedly-faulting-actor")
        .expect("actor_of");
    let (tx, rx) = crossbeam_channel::unbounded::<String>();

    for i in 0..5 {
        actor.send_msg(FaultMsg::Throw(format!("boom-{i}")), None);
        actor.send_msg(FaultMsg::Reply(format!("ok-{i}"), tx.clone()), None);
    }

    for i in 0..5 {
        let reply = rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap_or_else(|_| panic!("actor stopped responding after panic {i}"));
        assert_eq!(reply, format!("ok-{i}"));
    }
    assert_eq!(restarts.load(Ordering::SeqCst), 5);
}

struct StopSup {
    child: Option<ActorRef<FaultMsg>>,
    terminated: ChanSender<()>,
}

#[derive(Clone, Debug)]
enum StopSupMsg {
    Forward(FaultMsg),
    ChildGone(Terminated),
}

impl From<Terminated> for StopSupMsg {
    fn from(t: Terminated) -> Self {
        StopSupMsg::ChildGone(t)
    }
}

impl ActorFactoryArgs<ChanSender<()>> for StopSup {
    fn create_args(terminated: ChanSender<()>) -> Self {
        StopSup { child: None, terminated }
    }
}

impl Actor for StopSup {
    type Msg = StopSupMsg;

    fn pre_start(&mut self, ctx: &Context<Self::Msg>) {
        let child = ctx
            .actor_of(Props::<PanicActor>::args(Arc::new(AtomicU32::new(0))), "doomed-child")
            .expect("spawn child");
        ctx.watch(&child.clone().into());
        self.child = Some(child);
    }

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        match msg {
            StopSupMsg::Forward(inner) => {
                self.child.as_ref().unwrap().send_msg(inner, None);
            }
            StopSupMsg::ChildGone(_) => {
                let _ = self.terminated.send(());
            }
        }
    }

    fn supervisor_strategy(&self) -> Strategy {
        Strategy::one_for_one(Decider::with_default(Directive::Stop))
    }
}

#[test]
fn stop_directive_terminates_the_failed_child() {
    let system = ActorSystem::new().expect("system");
    let (tx, rx) = crossbeam_channel::unbounded::<()>();
    let sup = system
        .actor_of(Props::<StopSup>::args(tx), "stop-supervisor")
        .expect("actor_of");

    sup.send_msg(StopSupMsg::Forward(FaultMsg::Throw("fatal".into())), None);

    assert!(
        rx.recv_timeout(Duration::from_secs(2)).is_ok(),
        "child was not terminated after its supervisor decided Stop"
    );
}

struct EscalatingMid {
    child: Option<ActorRef<FaultMsg>>,
    restarts: Arc<AtomicU32>,
}

#[derive(Clone, Debug)]
enum MidMsg {
    Forward(FaultMsg),
}

impl ActorFactoryArgs<Arc<AtomicU32>> for EscalatingMid {
    fn create_args(restarts: Arc<AtomicU32>) -> Self {
        EscalatingMid { child: None, restarts }
    }
}

impl Actor for EscalatingMid {
    type Msg = MidMsg;

    fn pre_start(&mut self, ctx: &Context<Self::Msg>) {
        self.child = ctx
            .actor_of(Props::<PanicActor>::args(Arc::new(AtomicU32::new(0))), "fault-child")
            .ok();
    }

    fn post_restart(&mut self, _ctx: &Context<Self::Msg>, _failure: &Failure) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        let MidMsg::Forward(inner) = msg;
        self.child.as_ref().unwrap().send_msg(inner, None);
    }

    fn supervisor_strategy(&self) -> Strategy {
        Strategy::one_for_one(Decider::with_default(Directive::Escalate))
    }
}

#[test]
fn escalated_failure_is_handled_by_the_grandparent() {
    let system = ActorSystem::new().expect("system");
    let restarts = Arc::new(AtomicU32::new(0));
    let mid = system
        .actor_of(Props::<EscalatingMid>::args(restarts.clone()), "escalating-mid")
        .expect("actor_of");

    // The user guardian's own default strategy (OneForOne, Restart) is
    // what decides this once it arrives escalated -- there is nothing
    // else above it in this tree.
    mid.send_msg(MidMsg::Forward(FaultMsg::Throw("deep fault".into())), None);

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(
        restarts.load(Ordering::SeqCst),
        1,
        "escalation should have caused the mid-level supervisor itself to restart"
    );
}

struct AllForOneSup {
    a: Option<ActorRef<FaultMsg>>,
    restarts_a: Arc<AtomicU32>,
    restarts_b: Arc<AtomicU32>,
}

#[derive(Clone, Debug)]
struct FailA;

impl ActorFactoryArgs<(Arc<AtomicU32>, Arc<AtomicU32>)> for AllForOneSup {
    fn create_args((restarts_a, restarts_b): (Arc<AtomicU32>, Arc<AtomicU32>)) -> Self {
        AllForOneSup { a: None, restarts_a, restarts_b }
    }
}

impl Actor for AllForOneSup {
    type Msg = FailA;

    fn pre_start(&mut self, ctx: &Context<Self::Msg>) {
        self.a = ctx.actor_of(Props::<PanicActor>::args(self.restarts_a.clone()), "sibling-a").ok();
        ctx.actor_of(Props::<PanicActor>::args(self.restarts_b.clone()), "sibling-b").unwrap();
    }

    fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {
        self.a.as_ref().unwrap().send_msg(FaultMsg::Throw("shared fate".into()), None);
    }

    fn supervisor_strategy(&self) -> Strategy {
        Strategy::all_for_one(Decider::default())
    }
}

#[test]
fn all_for_one_restarts_every_sibling_not_just_the_failing_one() {
    let system = ActorSystem::new().expect("system");
    let restarts_a = Arc::new(AtomicU32::new(0));
    let restarts_b = Arc::new(AtomicU32::new(0));

    let sup = system
        .actor_of(Props::<AllForOneSup>::args((restarts_a.clone(), restarts_b.clone())), "all-for-one-sup")
        .expect("actor_of");

    sup.send_msg(FailA, None);

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(restarts_a.load(Ordering::SeqCst), 1, "the failing sibling should have restarted");
    assert_eq!(
        restarts_b.load(Ordering::SeqCst),
        1,
        "AllForOne should restart the non-failing sibling too"
    );
}

struct RateLimitedSup {
    child: Option<ActorRef<FaultMsg>>,
    restarts: Arc<AtomicU32>,
    terminated: ChanSender<()>,
}

#[derive(Clone, Debug)]
enum RateLimitedMsg {
    Forward(FaultMsg),
    ChildGone(Terminated),
}

impl From<Terminated> for RateLimitedMsg {
    fn from(t: Terminated) -> Self {
        RateLimitedMsg::ChildGone(t)
    }
}

impl ActorFactoryArgs<(Arc<AtomicU32>, ChanSender<()>)> for RateLimitedSup {
    fn create_args((restarts, terminated): (Arc<AtomicU32>, ChanSender<()>)) -> Self {
        RateLimitedSup { child: None, restarts, terminated }
    }
}

impl Actor for RateLimitedSup {
    type Msg = RateLimitedMsg;

    fn pre_start(&mut self, ctx: &Context<Self::Msg>) {
        let child = ctx
            .actor_of(Props::<PanicActor>::args(self.restarts.clone()), "rate-limited-child")
            .expect("spawn child");
        ctx.watch(&child.clone().into());
        self.child = Some(child);
    }

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        match msg {
            RateLimitedMsg::Forward(inner) => {
                if let Some(child) = &self.child {
                    child.send_msg(inner, None);
                }
            }
            RateLimitedMsg::ChildGone(_) => {
                let _ = self.terminated.send(());
            }
        }
    }

    fn supervisor_strategy(&self) -> Strategy {
        Strategy::one_for_one(Decider::default()).with_retry_limit(2, Duration::from_secs(60))
    }
}

#[test]
fn restart_budget_exhaustion_stops_the_child_instead_of_restarting_forever() {
    let system = ActorSystem::new().expect("system");
    let restarts = Arc::new(AtomicU32::new(0));
    let (tx, rx) = crossbeam_channel::unbounded::<()>();
    let sup = system
        .actor_of(Props::<RateLimitedSup>::args((restarts.clone(), tx)), "rate-limited-sup")
        .expect("actor_of");

    sup.send_msg(RateLimitedMsg::Forward(FaultMsg::Throw("boom-1".into())), None);
    std::thread::sleep(Duration::from_millis(200));
    sup.send_msg(RateLimitedMsg::Forward(FaultMsg::Throw("boom-2".into())), None);
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(restarts.load(Ordering::SeqCst), 2, "the first two failures should each have restarted the child");
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err(), "child should not be terminated yet");

    sup.send_msg(RateLimitedMsg::Forward(FaultMsg::Throw("boom-3".into())), None);
    assert!(
        rx.recv_timeout(Duration::from_secs(2)).is_ok(),
        "the third failure exceeds max_retries and should stop the child instead of restarting it"
    );
    assert_eq!(restarts.load(Ordering::SeqCst), 2, "a stopped child must not run post_restart again");
}
