//! `ActorSystem`: the root handle every actor and every piece of the
//! runtime's ambient stack (dispatcher, timer, logger, dead letters,
//! event stream) hangs off of. Grounded in the teacher's `ActorSystem`
//! (the guardian-tree bootstrap sequence, `sys_actor_of`/`actor_of`
//! split, `print_tree`), rebuilt on top of this runtime's `Provider` and
//! untyped guardians instead of the teacher's single generic `Msg`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;

use crate::actor::{
    dead_letter, Actor, ActorFactory, ActorReference, ActorRef, BasicActorRef, Channel, ChannelMsg,
    ChannelRef, Context, Props, Sender,
};
use crate::config::{load_config, Settings};
use crate::error::CreateError;
use crate::kernel::{BalancingDispatcher, Dispatcher, PinnedDispatcher, Provider, StandardDispatcher};
use crate::protocol::{DeadLetter, Failure, LogEvent, SystemEvent, SystemMsg};
use crate::system::logger::build_logger;
use crate::system::timer::BasicTimer;
use crate::system::SystemError;
use crate::validate::validate_name;

/// A do-nothing actor used for the four fixed guardian nodes (`/`,
/// `/user`, `/system`, `/temp`). Its only job is to exist as a parent in
/// the tree and receive `Terminate` during shutdown.
struct Guardian;

impl ActorFactory for Guardian {
    fn create() -> Self {
        Guardian
    }
}

impl Actor for Guardian {
    type Msg = ();

    fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {}
}

struct SystemInner {
    name: String,
    settings: Settings,
    start_time: Instant,
    logger: slog::Logger,
    provider: Provider,
    dispatcher: Arc<dyn Dispatcher>,
    timer: Arc<BasicTimer>,
    _runtime: tokio::runtime::Runtime,
    root: OnceCell<BasicActorRef>,
    user_guardian: OnceCell<BasicActorRef>,
    system_guardian: OnceCell<BasicActorRef>,
    temp_guardian: OnceCell<BasicActorRef>,
    event_stream: OnceCell<ChannelRef<SystemEvent>>,
    dead_letters: OnceCell<ChannelRef<DeadLetter>>,
    log_channel: OnceCell<ChannelRef<LogEvent>>,
    terminating: AtomicBool,
}

/// Builds an `ActorSystem` with optional overrides to the loaded
/// `Settings` and the system's name (default: `"hive"`).
pub struct SystemBuilder {
    name: String,
    settings: Option<Settings>,
}

impl Default for SystemBuilder {
    fn default() -> Self {
        SystemBuilder {
            name: "hive".to_string(),
            settings: None,
        }
    }
}

impl SystemBuilder {
    pub fn new() -> Self {
        SystemBuilder::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn create(self) -> Result<ActorSystem, SystemError> {
        ActorSystem::build(self.name, self.settings.unwrap_or_else(load_config))
    }
}

/// The actor runtime and its ambient services: one per application. Cheap
/// to clone -- every clone shares the same guardians, dispatcher and
/// timer.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl ActorSystem {
    /// Shorthand for `SystemBuilder::new().create()`.
    pub fn new() -> Result<ActorSystem, SystemError> {
        SystemBuilder::new().create()
    }

    fn build(name: String, settings: Settings) -> Result<ActorSystem, SystemError> {
        validate_name(&name).map_err(|_| SystemError::InvalidName(name.clone()))?;

        let logger = build_logger(&settings.log);
        let dispatcher: Arc<dyn Dispatcher> = StandardDispatcher::new(&settings.dispatcher);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("hive-rt-timer")
            .enable_time()
            .build()
            .map_err(|e| SystemError::ModuleFailed(format!("tokio runtime: {e}")))?;
        let timer: Arc<BasicTimer> = Arc::new(BasicTimer::new(runtime.handle().clone()));

        let inner = Arc::new(SystemInner {
            name,
            settings,
            start_time: Instant::now(),
            logger,
            provider: Provider::new(),
            dispatcher,
            timer,
            _runtime: runtime,
            root: OnceCell::new(),
            user_guardian: OnceCell::new(),
            system_guardian: OnceCell::new(),
            temp_guardian: OnceCell::new(),
            event_stream: OnceCell::new(),
            dead_letters: OnceCell::new(),
            log_channel: OnceCell::new(),
            terminating: AtomicBool::new(false),
        });

        let system = ActorSystem { inner };

        let root: BasicActorRef = system
            .provider()
            .create_guardian(Props::<Guardian>::new(), "", "/", None, &system)
            .map_err(|_| SystemError::ModuleFailed("root guardian".into()))?
            .into();
        system.inner.root.set(root.clone()).ok();

        let user = system.spawn_guardian("user", "/user", &root)?;
        let sys = system.spawn_guardian("system", "/system", &root)?;
        let temp = system.spawn_guardian("temp", "/temp", &root)?;
        system.inner.user_guardian.set(user).ok();
        system.inner.system_guardian.set(sys.clone()).ok();
        system.inner.temp_guardian.set(temp).ok();

        let event_stream: ChannelRef<SystemEvent> = system
            .provider()
            .create_guardian(Props::<Channel<SystemEvent>>::args(()), "eventStream", "/system/eventStream", Some(sys.clone()), &system)
            .map_err(|_| SystemError::ModuleFailed("event stream".into()))?;
        system.inner.event_stream.set(event_stream).ok();

        let dead_letters: ChannelRef<DeadLetter> = system
            .provider()
            .create_guardian(Props::<Channel<DeadLetter>>::args(()), "deadLetters", "/system/deadLetters", Some(sys.clone()), &system)
            .map_err(|_| SystemError::ModuleFailed("dead letters".into()))?;
        system.inner.dead_letters.set(dead_letters).ok();

        let log_channel: ChannelRef<LogEvent> = system
            .provider()
            .create_guardian(Props::<Channel<LogEvent>>::args(()), "log", "/system/log", Some(sys), &system)
            .map_err(|_| SystemError::ModuleFailed("log channel".into()))?;
        system.inner.log_channel.set(log_channel).ok();

        slog::info!(system.inner.logger, "actor system started"; "name" => system.name());

        Ok(system)
    }

    fn spawn_guardian(&self, name: &str, path: &str, parent: &BasicActorRef) -> Result<BasicActorRef, SystemError> {
        self.provider()
            .create_guardian(Props::<Guardian>::new(), name, path, Some(parent.clone()), self)
            .map(Into::into)
            .map_err(|_| SystemError::ModuleFailed(name.into()))
    }

    pub(crate) fn provider(&self) -> &Provider {
        &self.inner.provider
    }

    pub(crate) fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        self.inner.dispatcher.clone()
    }

    pub fn timer(&self) -> &BasicTimer {
        self.inner.timer.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn uptime(&self) -> Duration {
        self.inner.start_time.elapsed()
    }

    pub fn log(&self) -> &slog::Logger {
        &self.inner.logger
    }

    pub fn user_root(&self) -> BasicActorRef {
        self.inner.user_guardian.get().expect("system not fully initialized").clone()
    }

    pub fn system_root(&self) -> BasicActorRef {
        self.inner.system_guardian.get().expect("system not fully initialized").clone()
    }

    pub fn temp_root(&self) -> BasicActorRef {
        self.inner.temp_guardian.get().expect("system not fully initialized").clone()
    }

    pub fn event_stream(&self) -> &ChannelRef<SystemEvent> {
        self.inner.event_stream.get().expect("system not fully initialized")
    }

    pub fn dead_letters(&self) -> &ChannelRef<DeadLetter> {
        self.inner.dead_letters.get().expect("system not fully initialized")
    }

    pub fn log_channel(&self) -> &ChannelRef<LogEvent> {
        self.inner.log_channel.get().expect("system not fully initialized")
    }

    /// Creates an actor under `/user`.
    pub fn actor_of<A: Actor>(&self, props: Props<A>, name: &str) -> Result<ActorRef<A::Msg>, CreateError> {
        let parent = self.user_root();
        self.provider().create_actor(props, name, &parent, self)
    }

    /// Creates an actor under `/user` pinned to its own dedicated worker
    /// thread, for blocking or long-running behaviors that would
    /// otherwise starve the shared pool.
    pub fn actor_of_pinned<A: Actor>(&self, props: Props<A>, name: &str) -> Result<ActorRef<A::Msg>, CreateError> {
        let parent = self.user_root();
        let dispatcher = PinnedDispatcher::new(format!("hive-pinned-{name}"));
        self.provider().create_actor_with_dispatcher(props, name, &parent, self, dispatcher)
    }

    /// Builds a fresh `BalancingDispatcher` buddy group. Pass the same
    /// `Arc<dyn Dispatcher>` to every `actor_of_on` call for the sibling
    /// actors meant to share its mailbox -- they must all be the same
    /// actor type, enforced at creation time.
    pub fn balancing_dispatcher(&self) -> Arc<dyn Dispatcher> {
        BalancingDispatcher::new(&self.inner.settings.dispatcher)
    }

    /// Creates an actor under `/user` on a caller-supplied dispatcher,
    /// typically one built with `balancing_dispatcher`.
    pub fn actor_of_on<A: Actor>(
        &self,
        props: Props<A>,
        name: &str,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<ActorRef<A::Msg>, CreateError> {
        let parent = self.user_root();
        self.provider().create_actor_with_dispatcher(props, name, &parent, self, dispatcher)
    }

    /// Creates an actor under `/system`, for framework-internal plumbing.
    pub fn sys_actor_of<A: Actor>(&self, props: Props<A>, name: &str) -> Result<ActorRef<A::Msg>, CreateError> {
        let parent = self.system_root();
        self.provider().create_actor(props, name, &parent, self)
    }

    /// Creates an actor under `/temp`, typically a short-lived ask/reply
    /// target. Its name is generated since callers rarely care about it.
    pub fn temp_actor_of<A: Actor>(&self, props: Props<A>) -> Result<ActorRef<A::Msg>, CreateError> {
        let parent = self.temp_root();
        let name = format!("t{:x}", crate::uri::new_actor_id());
        self.provider().create_actor(props, &name, &parent, self)
    }

    pub fn stop(&self, actor: &impl ActorReference) {
        actor.sys_tell(SystemMsg::Terminate);
    }

    /// Begins a graceful shutdown: every `/user` child receives
    /// `Terminate`; `/system` follows once `/user` is empty. Does not
    /// block -- actors finish their current run and call `post_stop`
    /// asynchronously.
    pub fn shutdown(&self) {
        if self.inner.terminating.swap(true, Ordering::AcqRel) {
            return;
        }
        slog::info!(self.inner.logger, "actor system shutting down"; "name" => self.name());
        self.stop(&self.user_root());
        self.stop(&self.system_root());
    }

    pub fn is_terminating(&self) -> bool {
        self.inner.terminating.load(Ordering::Acquire)
    }

    pub(crate) fn dead_letters_sink(&self) -> Arc<dyn Fn(DeadLetter) + Send + Sync> {
        let inner = self.inner.clone();
        Arc::new(move |dl: DeadLetter| {
            if let Some(channel) = inner.dead_letters.get() {
                dead_letter(dl, channel);
            }
        })
    }

    pub(crate) fn publish_event(&self, evt: SystemEvent) {
        slog::debug!(self.inner.logger, "system event"; "event" => format!("{:?}", &evt));
        if let Some(channel) = self.inner.event_stream.get() {
            let topic = crate::actor::Topic::from(&evt);
            channel.send_msg(ChannelMsg::Publish(crate::actor::Publish { topic, msg: evt }), None);
        }
    }

    fn publish_log(&self, evt: LogEvent) {
        if let Some(channel) = self.inner.log_channel.get() {
            channel.send_msg(
                ChannelMsg::Publish(crate::actor::Publish {
                    topic: crate::actor::Topic::from(crate::actor::All),
                    msg: evt,
                }),
                None,
            );
        }
    }

    pub fn log_debug(&self, source: &str, text: &str) {
        slog::debug!(self.inner.logger, "{}", text; "source" => source);
        self.publish_log(LogEvent::Debug {
            source: source.to_string(),
            text: text.to_string(),
        });
    }

    pub fn log_warning(&self, source: &str, text: &str) {
        slog::warn!(self.inner.logger, "{}", text; "source" => source);
        self.publish_log(LogEvent::Warning {
            source: source.to_string(),
            text: text.to_string(),
        });
    }

    pub fn log_error(&self, source: &str, text: &str, cause: Option<&Failure>) {
        let cause_text = cause.map(|c| c.to_string()).unwrap_or_default();
        slog::error!(self.inner.logger, "{}", text; "source" => source, "cause" => cause_text);
        self.publish_log(LogEvent::Error {
            source: source.to_string(),
            text: text.to_string(),
            cause: cause.map(|c| c.0.clone()),
        });
    }

    /// Prints the actor tree rooted at `/` to stdout, depth-first.
    pub fn print_tree(&self) {
        fn print_node(node: &BasicActorRef, indent: &str, is_root: bool) {
            if is_root {
                println!("/");
            } else {
                println!("{}└─ {}", indent, node.name());
            }
            for child in node.children() {
                print_node(&child, &format!("{}   ", indent), false);
            }
        }

        let root = self.inner.root.get().expect("system not fully initialized");
        print_node(root, "", true);
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ActorSystem[name={}, uptime={:?}]",
            self.name(),
            self.uptime()
        )
    }
}
