//! Turns a `Props<A>` into a running cell: validates the name, reserves
//! the path, wires up a mailbox and dispatcher, and kicks off `Create`.
//! Grounded in the teacher's `provider.rs` (the `DashMap`-backed path
//! registry, the register-then-build-then-`ActorInit` sequence),
//! generalized to build the new `ExtendedCell`/`CellRuntime` pair instead
//! of the teacher's `kernel()`/`KernelRef` split.

use std::any::{Any, TypeId};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::actor::{Actor, ActorCell, ActorRef, ActorReference, BasicActorRef, BoxActorProd, ExtendedCell, Context, Props};
use crate::error::CreateError;
use crate::kernel::cell_runtime::CellRuntime;
use crate::kernel::dispatcher::Dispatcher;
use crate::kernel::mailbox::{mailbox, MailboxSender};
use crate::protocol::SystemMsg;
use crate::system::ActorSystem;
use crate::uri::ActorUri;
use crate::validate::validate_name;

/// The system-wide registry of occupied actor paths, plus the
/// construction logic shared by every `actor_of`/`sys_actor_of` call.
pub struct Provider {
    paths: DashMap<String, ()>,
}

impl Provider {
    pub fn new() -> Self {
        Provider { paths: DashMap::new() }
    }

    /// Creates a user-facing actor at `parent`'s path plus `name`, on the
    /// system's default dispatcher. `name` is validated and must be
    /// unique among `parent`'s children.
    pub fn create_actor<A: Actor>(
        &self,
        props: Props<A>,
        name: &str,
        parent: &BasicActorRef,
        system: &ActorSystem,
    ) -> Result<ActorRef<A::Msg>, CreateError> {
        self.create_actor_with_dispatcher(props, name, parent, system, system.dispatcher())
    }

    /// As `create_actor`, but attaches the new cell to `dispatcher`
    /// instead of the system default -- the way to put an actor on a
    /// `PinnedDispatcher` or into a `BalancingDispatcher` buddy group.
    pub fn create_actor_with_dispatcher<A: Actor>(
        &self,
        props: Props<A>,
        name: &str,
        parent: &BasicActorRef,
        system: &ActorSystem,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<ActorRef<A::Msg>, CreateError> {
        validate_name(name)?;
        if parent.is_terminating() {
            return Err(CreateError::ParentTerminating);
        }

        let uri = parent.uri().child(name);
        self.spawn(props, uri, Some(parent.clone()), system, dispatcher)
    }

    /// Bypasses name validation and builds the `ActorUri` from an
    /// explicit `path` rather than `parent.child(name)`. Used only to
    /// bootstrap the system's fixed-path guardians and channels, which
    /// sit at paths (`/`, `/system/eventStream`, ...) ordinary names
    /// could never produce.
    pub(crate) fn create_guardian<A: Actor>(
        &self,
        props: Props<A>,
        name: &str,
        path: &str,
        parent: Option<BasicActorRef>,
        system: &ActorSystem,
    ) -> Result<ActorRef<A::Msg>, CreateError> {
        let uri = ActorUri::new(name, path);
        self.spawn(props, uri, parent, system, system.dispatcher())
    }

    /// Drops a terminated actor's path from the registry, freeing it for
    /// reuse. Called once a cell finishes its termination protocol.
    pub fn forget(&self, path: &str) {
        self.paths.remove(path);
    }

    fn spawn<A: Actor>(
        &self,
        props: Props<A>,
        uri: ActorUri,
        parent: Option<BasicActorRef>,
        system: &ActorSystem,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<ActorRef<A::Msg>, CreateError> {
        if system.is_terminating() {
            return Err(CreateError::SystemShuttingDown);
        }

        dispatcher
            .join_class(TypeId::of::<A>())
            .map_err(|_| CreateError::InvalidActorClassForBalancingDispatcher(uri.path.to_string()))?;

        if self.paths.insert(uri.path.to_string(), ()).is_some() {
            return Err(CreateError::AlreadyExists(uri.path.to_string()));
        }

        let initial = match catch_unwind(AssertUnwindSafe(|| props.produce())) {
            Ok(instance) => instance,
            Err(_) => {
                self.paths.remove(uri.path.as_str());
                return Err(CreateError::Panicked);
            }
        };

        let cell = ActorCell::new(uri, parent.clone());
        let dead_letters = system.dead_letters_sink();
        let throughput = system.settings().mailbox.msg_process_limit;
        let throughput_deadline = system.settings().mailbox.throughput_deadline();

        let runtime_cell: Arc<OnceCell<CellRuntime<A::Msg>>> = Arc::new(OnceCell::new());

        // A `Balancing` dispatcher keeps one shared `MailboxSender` per
        // buddy group instead of a private one per cell: the first cell
        // to join builds it (and the scheduler that round-robins among
        // whichever members have registered by the time it fires), every
        // later buddy just clones the same sender and adds itself as a
        // member the shared scheduler can pick.
        let sender: MailboxSender<A::Msg> = match dispatcher.shared_mailbox_slot() {
            Some(slot) => {
                let boxed = slot.get_or_init(|| {
                    let shared_scheduler = dispatcher.build_shared_scheduler();
                    let shared: MailboxSender<A::Msg> =
                        mailbox(system.settings().mailbox.capacity(), shared_scheduler);
                    Box::new(shared) as Box<dyn Any + Send + Sync>
                });
                boxed
                    .downcast_ref::<MailboxSender<A::Msg>>()
                    .expect("join_class guarantees every buddy in this group shares A::Msg")
                    .clone()
            }
            None => {
                let scheduler_cell = runtime_cell.clone();
                let scheduler_dispatcher = dispatcher.clone();
                let scheduler: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                    if let Some(runtime) = scheduler_cell.get() {
                        let runtime = runtime.clone();
                        scheduler_dispatcher
                            .execute(Box::new(move || runtime.run(throughput, throughput_deadline)));
                    }
                });
                mailbox::<A::Msg>(system.settings().mailbox.capacity(), scheduler)
            }
        };
        let push_timeout = Duration::from_millis(system.settings().mailbox.push_timeout_millis);
        let shared_group = dispatcher.shared_mailbox_slot().is_some();
        let ext_cell = ExtendedCell::new(cell.clone(), sender.clone(), dispatcher.clone(), dead_letters, push_timeout);
        cell.set_any_sender(Arc::new(ext_cell.clone()));

        let actor_ref = ActorRef::new(ext_cell.clone());
        let basic_ref: BasicActorRef = actor_ref.clone().into();
        if let Some(parent) = &parent {
            parent.cell().add_child(basic_ref.clone());
        }

        let context = Arc::new(Context::new(actor_ref.clone(), system.clone()));
        let producer: BoxActorProd<A::Msg> = {
            let producer_props = props.clone();
            Arc::new(move || producer_props.produce())
        };
        let instance = Arc::new(Mutex::new(initial));

        let runtime = CellRuntime {
            ext_cell,
            context,
            instance,
            producer,
            system: system.clone(),
        };
        let _ = runtime_cell.set(runtime);

        if shared_group {
            let member_cell = runtime_cell.clone();
            let member: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                if let Some(runtime) = member_cell.get() {
                    runtime.run(throughput, throughput_deadline);
                }
            });
            dispatcher.register_member(member);
        }

        sender.suspend();
        sender.system_enqueue(SystemMsg::Create);

        Ok(actor_ref)
    }
}
