//! The `Timer` subsystem (one-shot and repeating delayed delivery,
//! cancellation), plus dispatcher placement: a `BalancingDispatcher`
//! buddy group shares work across its members rather than duplicating or
//! dropping it (S3), and a supervisor watching a large wave of
//! short-lived children accounts for every one of them (S6).

mod support;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hive_rt::actors::*;
use hive_rt::system::Timer;
use support::Latch;

#[derive(Clone, Debug)]
struct Tick;

struct TickCounter {
    latch: Arc<Latch>,
    ticks: Arc<AtomicU32>,
}

impl ActorFactoryArgs<(Arc<Latch>, Arc<AtomicU32>)> for TickCounter {
    fn create_args((latch, ticks): (Arc<Latch>, Arc<AtomicU32>)) -> Self {
        TickCounter { latch, ticks }
    }
}

impl Actor for TickCounter {
    type Msg = Tick;

    fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.latch.count_down();
    }
}

#[test]
fn schedule_once_delivers_after_the_delay_and_not_before() {
    let system = ActorSystem::new().expect("system");
    let ticks = Arc::new(AtomicU32::new(0));
    let latch = Latch::new(1);
    let actor = system
        .actor_of(Props::<TickCounter>::args((latch.clone(), ticks.clone())), "tick-once")
        .expect("actor_of");

    system.timer().schedule_once(Duration::from_millis(200), actor, None, Tick);

    assert!(!latch.wait_timeout(Duration::from_millis(50)), "fired before its delay elapsed");
    assert!(latch.wait_timeout(Duration::from_secs(2)), "never fired");
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn schedule_repeat_fires_until_cancelled() {
    let system = ActorSystem::new().expect("system");
    let ticks = Arc::new(AtomicU32::new(0));
    let latch = Latch::new(3);
    let actor = system
        .actor_of(Props::<TickCounter>::args((latch.clone(), ticks.clone())), "tick-repeat")
        .expect("actor_of");

    let id = system.timer().schedule(
        Duration::from_millis(50),
        Duration::from_millis(50),
        actor,
        None,
        Tick,
    );

    assert!(latch.wait_timeout(Duration::from_secs(2)), "fewer than 3 ticks arrived");
    system.timer().cancel_schedule(id);

    let after_cancel = ticks.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(250));
    assert_eq!(
        ticks.load(Ordering::SeqCst),
        after_cancel,
        "ticks kept arriving after cancel_schedule"
    );
}

#[derive(Clone, Debug)]
enum WorkMsg {
    Wait(Duration),
    Reply(Arc<Latch>),
}

struct Worker {
    received: Arc<AtomicU32>,
}

impl ActorFactoryArgs<Arc<AtomicU32>> for Worker {
    fn create_args(received: Arc<AtomicU32>) -> Self {
        Worker { received }
    }
}

impl Actor for Worker {
    type Msg = WorkMsg;

    fn recv(&mut self, _ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        self.received.fetch_add(1, Ordering::SeqCst);
        match msg {
            WorkMsg::Wait(d) => thread::sleep(d),
            WorkMsg::Reply(latch) => latch.count_down(),
        }
    }
}

#[test]
fn balancing_dispatcher_distributes_work_across_its_members() {
    let system = ActorSystem::new().expect("system");
    let dispatcher = system.balancing_dispatcher();

    let total_received = Arc::new(AtomicU32::new(0));
    let a = system
        .actor_of_on(Props::<Worker>::args(total_received.clone()), "worker-a", dispatcher.clone())
        .expect("actor_of_on a");
    let b = system
        .actor_of_on(Props::<Worker>::args(total_received.clone()), "worker-b", dispatcher)
        .expect("actor_of_on b");

    let latch = Latch::new(3);
    a.send_msg(WorkMsg::Wait(Duration::from_millis(50)), None);
    b.send_msg(WorkMsg::Reply(latch.clone()), None);
    a.send_msg(WorkMsg::Reply(latch.clone()), None);
    b.send_msg(WorkMsg::Reply(latch.clone()), None);

    assert!(latch.wait_timeout(Duration::from_secs(5)), "not all messages were processed");
    // Three messages sent across the group, three received in total --
    // neither duplicated onto both members nor dropped.
    assert_eq!(total_received.load(Ordering::SeqCst), 3);
}

struct OtherWorker;

impl ActorFactory for OtherWorker {
    fn create() -> Self {
        OtherWorker
    }
}

impl Actor for OtherWorker {
    type Msg = ();

    fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {}
}

#[test]
fn balancing_dispatcher_rejects_a_second_actor_class() {
    let system = ActorSystem::new().expect("system");
    let dispatcher = system.balancing_dispatcher();

    let received = Arc::new(AtomicU32::new(0));
    let _first = system
        .actor_of_on(Props::<Worker>::args(received), "worker-a", dispatcher.clone())
        .expect("first class establishes the group");

    let err = system
        .actor_of_on(Props::<OtherWorker>::new(), "worker-b", dispatcher)
        .expect_err("a different actor class must be rejected");
    assert!(matches!(err, hive_rt::error::CreateError::InvalidActorClassForBalancingDispatcher(_)));
}

#[derive(Clone, Debug)]
enum SupervisorMsg {
    SpawnWave(u32),
    ChildDone(Terminated),
}

impl From<Terminated> for SupervisorMsg {
    fn from(t: Terminated) -> Self {
        SupervisorMsg::ChildDone(t)
    }
}

struct WaveChild;

impl ActorFactory for WaveChild {
    fn create() -> Self {
        WaveChild
    }
}

impl Actor for WaveChild {
    type Msg = ();

    fn recv(&mut self, ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {
        ctx.stop(&ctx.myself());
    }
}

struct WaveSupervisor {
    done: Arc<AtomicU32>,
    completion: crossbeam_channel::Sender<u32>,
}

impl ActorFactoryArgs<(Arc<AtomicU32>, crossbeam_channel::Sender<u32>)> for WaveSupervisor {
    fn create_args((done, completion): (Arc<AtomicU32>, crossbeam_channel::Sender<u32>)) -> Self {
        WaveSupervisor { done, completion }
    }
}

impl Actor for WaveSupervisor {
    type Msg = SupervisorMsg;

    fn recv(&mut self, ctx: &Context<Self::Msg>, msg: Self::Msg, _sender: Sender) {
        match msg {
            SupervisorMsg::SpawnWave(count) => {
                for i in 0..count {
                    let child = ctx
                        .actor_of(Props::<WaveChild>::new(), &format!("wave-child-{i}"))
                        .expect("spawn wave child");
                    ctx.watch(&child.clone().into());
                    child.send_msg((), None);
                }
            }
            SupervisorMsg::ChildDone(_) => {
                let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
                let _ = self.completion.send(n);
            }
        }
    }
}

// The scenario this guards against spawns 50,000 children; scaled down
// here so the suite stays fast, not because the runtime has a lower
// ceiling.
const WAVE_SIZE: u32 = 2_000;

#[test]
fn supervisor_accounts_for_every_child_in_a_large_wave() {
    for round in 0..3 {
        let system = ActorSystem::new().expect("system");
        let done = Arc::new(AtomicU32::new(0));
        let (tx, rx) = crossbeam_channel::unbounded::<u32>();

        let sup = system
            .actor_of(Props::<WaveSupervisor>::args((done.clone(), tx)), "wave-supervisor")
            .expect("actor_of");
        sup.send_msg(SupervisorMsg::SpawnWave(WAVE_SIZE), None);

        let mut last = 0;
        while last < WAVE_SIZE {
            last = rx
                .recv_timeout(Duration::from_secs(30))
                .unwrap_or_else(|_| panic!("round {round}: only {last}/{WAVE_SIZE} children accounted for"));
        }
        assert_eq!(done.load(Ordering::SeqCst), WAVE_SIZE);
    }
}
