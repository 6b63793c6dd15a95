//! Drives a single cell's mailbox run: dispatches system messages to the
//! lifecycle/supervision state machine, user messages to hotswap/`recv`,
//! and catches panics at the boundary so one misbehaving actor can report
//! itself to its supervisor instead of taking the dispatcher thread down.
//! Grounded in the shape of the teacher's `ActorCell::receive_cmd`/
//! `handle_failure`, generalized to the `SystemMsg`/`Directive` protocol
//! this runtime carries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use parking_lot::Mutex;

use crate::actor::{ActorReference, BasicActorRef, BoxActor, BoxActorProd, Context, ExtendedCell};
use crate::error::RestartError;
use crate::kernel::mailbox::{run_mailbox, Envelope};
use crate::protocol::{Failure, SystemEvent, SystemMsg, Terminated};
use crate::supervision::{Directive, Scope, Strategy};
use crate::system::ActorSystem;
use crate::system::Timer;
use crate::Message;

/// Everything one mailbox run needs beyond the mailbox itself: the live
/// actor instance, a way to rebuild it on restart, and the cell's typed
/// and untyped handles.
pub(crate) struct CellRuntime<Msg: Message> {
    pub ext_cell: ExtendedCell<Msg>,
    pub context: Arc<Context<Msg>>,
    pub instance: Arc<Mutex<BoxActor<Msg>>>,
    pub producer: BoxActorProd<Msg>,
    pub system: ActorSystem,
}

impl<Msg: Message> Clone for CellRuntime<Msg> {
    fn clone(&self) -> Self {
        CellRuntime {
            ext_cell: self.ext_cell.clone(),
            context: self.context.clone(),
            instance: self.instance.clone(),
            producer: self.producer.clone(),
            system: self.system.clone(),
        }
    }
}

impl<Msg: Message> CellRuntime<Msg> {
    pub fn run(&self, throughput: u32, throughput_deadline: Option<std::time::Duration>) {
        run_mailbox(
            self.ext_cell.mailbox(),
            throughput,
            throughput_deadline,
            |m| self.handle_system(m),
            |e| self.handle_user(e),
        );
    }

    fn myself(&self) -> BasicActorRef {
        BasicActorRef::new(self.ext_cell.underlying().clone())
    }

    fn handle_user(&self, envelope: Envelope<Msg>) {
        let Envelope { msg, sender } = envelope;
        let instance = self.instance.clone();
        let context = self.context.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if !context.invoke_hotswap(msg.clone(), sender.clone()) {
                instance.lock().recv(&context, msg, sender);
            }
        }));

        if let Err(payload) = outcome {
            self.report_failure(panic_message(&payload));
        }

        self.rearm_receive_timeout();
    }

    fn handle_system(&self, msg: SystemMsg) {
        match msg {
            SystemMsg::Create => self.on_create(),
            SystemMsg::Recreate(cause) => self.on_recreate(cause),
            SystemMsg::Suspend => self.ext_cell.mailbox().suspend(),
            SystemMsg::Resume => self.ext_cell.mailbox().resume(),
            SystemMsg::Terminate => self.on_terminate(),
            SystemMsg::Supervise(_) => {}
            SystemMsg::ChildTerminated(child) => self.on_child_terminated(child),
            SystemMsg::Watch { watchee: _, watcher } => {
                self.ext_cell.underlying().record_watcher(watcher);
            }
            SystemMsg::Unwatch { watchee: _, watcher } => {
                self.ext_cell.underlying().forget_watcher(&watcher);
            }
            SystemMsg::Failed { child, cause } => self.on_child_failed(child, cause),
        }
    }

    fn on_create(&self) {
        let panicked = {
            let mut instance = self.instance.lock();
            catch_unwind(AssertUnwindSafe(|| instance.pre_start(&self.context))).is_err()
        };
        if panicked {
            self.report_failure("pre_start panicked".to_string());
            return;
        }

        {
            let mut instance = self.instance.lock();
            let _ = catch_unwind(AssertUnwindSafe(|| instance.post_start(&self.context)));
        }

        self.ext_cell.mailbox().resume();
        self.system.publish_event(SystemEvent::ActorCreated(self.myself()));
    }

    fn on_recreate(&self, cause: Failure) {
        if self.ext_cell.is_terminating() {
            self.system
                .log_warning(self.ext_cell.uri().path.as_str(), &RestartError::Terminating.to_string());
            return;
        }

        {
            let mut instance = self.instance.lock();
            let _ = catch_unwind(AssertUnwindSafe(|| instance.pre_restart(&self.context, &cause)));
        }

        let mut fresh = match catch_unwind(AssertUnwindSafe(|| (self.producer)())) {
            Ok(fresh) => fresh,
            Err(payload) => {
                let err = RestartError::ProducerFailed;
                self.system.log_error(
                    self.ext_cell.uri().path.as_str(),
                    &format!("{err}: {}", panic_message(&payload)),
                    Some(&cause),
                );
                self.report_failure(err.to_string());
                return;
            }
        };
        let _ = catch_unwind(AssertUnwindSafe(|| fresh.post_restart(&self.context, &cause)));
        *self.instance.lock() = fresh;

        self.ext_cell.mailbox().resume();
        self.system.publish_event(SystemEvent::ActorRestarted(self.myself()));
    }

    fn on_terminate(&self) {
        self.ext_cell.underlying().set_terminating();
        self.context.cancel_receive_timeout();
        let children = self.ext_cell.children();
        if children.is_empty() {
            self.finish_termination();
        } else {
            for child in children {
                child.sys_tell(SystemMsg::Terminate);
            }
        }
    }

    fn on_child_terminated(&self, child: BasicActorRef) {
        self.ext_cell.underlying().remove_child(child.path());
        if self.ext_cell.is_terminating() && !self.ext_cell.underlying().has_children() {
            self.finish_termination();
        }
    }

    fn finish_termination(&self) {
        {
            let mut instance = self.instance.lock();
            let _ = catch_unwind(AssertUnwindSafe(|| instance.post_stop(&self.context)));
        }

        let me = self.myself();
        for watcher in self.ext_cell.underlying().watchers() {
            let _ = watcher.try_tell(Terminated(me.clone()), None);
        }
        if let Some(parent) = self.ext_cell.parent() {
            parent.sys_tell(SystemMsg::ChildTerminated(me.clone()));
        }
        self.system.publish_event(SystemEvent::ActorTerminated(me.clone()));
        self.system.provider().forget(me.path());
        self.ext_cell.close();
    }

    fn on_child_failed(&self, child: BasicActorRef, cause: Failure) {
        let mut stats = self.ext_cell.underlying().restart_stats_for(child.path());
        let strategy = self.instance.lock().supervisor_strategy();
        let directive = strategy.handle(&cause, &mut stats);
        self.ext_cell.underlying().put_restart_stats(child.path(), stats);

        self.system
            .log_warning(child.path(), &format!("{} ({:?})", cause, directive));

        match directive {
            Directive::Resume => child.sys_tell(SystemMsg::Resume),
            Directive::Restart => self.apply_to_scope(&strategy, &child, |c| {
                c.sys_tell(SystemMsg::Suspend);
                c.sys_tell(SystemMsg::Recreate(cause.clone()));
            }),
            Directive::Stop => self.apply_to_scope(&strategy, &child, |c| c.sys_tell(SystemMsg::Terminate)),
            Directive::Escalate => match self.ext_cell.parent() {
                Some(parent) => parent.sys_tell(SystemMsg::Failed {
                    child: self.myself(),
                    cause,
                }),
                None => child.sys_tell(SystemMsg::Terminate),
            },
        }
    }

    fn apply_to_scope(&self, strategy: &Strategy, child: &BasicActorRef, f: impl Fn(&BasicActorRef)) {
        match strategy.scope {
            Scope::OneForOne => f(child),
            Scope::AllForOne => {
                for sibling in self.ext_cell.children() {
                    f(&sibling);
                }
            }
        }
    }

    fn report_failure(&self, reason: String) {
        self.ext_cell.mailbox().suspend();
        let cause = Failure::new(reason);
        match self.ext_cell.parent() {
            Some(parent) => parent.sys_tell(SystemMsg::Failed {
                child: self.myself(),
                cause,
            }),
            None => {
                self.system
                    .log_error(self.ext_cell.uri().path.as_str(), "guardian panicked", Some(&cause));
                self.ext_cell.sys_tell(SystemMsg::Terminate);
            }
        }
    }

    fn rearm_receive_timeout(&self) {
        let generation = self.context.bump_generation();
        if let Some((duration, deliver)) = self.context.receive_timeout_job() {
            let context = self.context.clone();
            let job: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                if context.current_generation() == generation {
                    deliver();
                }
            });
            self.system.timer().schedule_raw(duration, job);
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
