//! Actor construction. `Props<A>` is a small, cloneable recipe for
//! producing (and, on restart, re-producing) an instance of `A`, grounded
//! in the shape the teacher's `provider.rs` already expects
//! (`Props::new_args::<Guardian, _>(args)` plus an `ActorFactoryArgs`
//! trait) even though the teacher's own `props.rs` still carries the
//! older closure-based `ActorProducer` design -- this rewrites that file
//! to match what the rest of the newer generation already assumes.

use std::sync::Arc;

use crate::actor::{Actor, BoxActor};

/// Implemented by actors with a zero-argument constructor.
pub trait ActorFactory: Actor {
    fn create() -> Self;
}

/// Implemented by actors that need arguments to construct. `Args` is
/// cloned once per (re)instantiation, so it must be cheap to clone --
/// typically a small struct of `Arc`s and primitives.
pub trait ActorFactoryArgs<Args>: Actor {
    fn create_args(args: Args) -> Self;
}

trait Producer<Msg>: Send + Sync {
    fn produce(&self) -> BoxActor<Msg>;
}

struct FactoryProducer<A: ActorFactory> {
    _marker: std::marker::PhantomData<fn() -> A>,
}

impl<A: ActorFactory> Producer<A::Msg> for FactoryProducer<A> {
    fn produce(&self) -> BoxActor<A::Msg> {
        Box::new(A::create())
    }
}

struct ArgsProducer<A: ActorFactoryArgs<Args>, Args: Clone + Send + Sync + 'static> {
    args: Args,
    _marker: std::marker::PhantomData<fn() -> A>,
}

impl<A, Args> Producer<A::Msg> for ArgsProducer<A, Args>
where
    A: ActorFactoryArgs<Args>,
    Args: Clone + Send + Sync + 'static,
{
    fn produce(&self) -> BoxActor<A::Msg> {
        Box::new(A::create_args(self.args.clone()))
    }
}

/// A cloneable recipe for producing an actor instance. The cell keeps one
/// of these around for the lifetime of the actor so a restart can build a
/// fresh instance without the caller having to supply it again.
pub struct Props<A: Actor> {
    producer: Arc<dyn Producer<A::Msg>>,
}

impl<A: Actor> Clone for Props<A> {
    fn clone(&self) -> Self {
        Props {
            producer: self.producer.clone(),
        }
    }
}

impl<A: ActorFactory> Props<A> {
    pub fn new() -> Self {
        Props {
            producer: Arc::new(FactoryProducer::<A> {
                _marker: std::marker::PhantomData,
            }),
        }
    }
}

impl<A: Actor> Props<A> {
    pub fn args<Args>(args: Args) -> Self
    where
        A: ActorFactoryArgs<Args>,
        Args: Clone + Send + Sync + 'static,
    {
        Props {
            producer: Arc::new(ArgsProducer::<A, Args> {
                args,
                _marker: std::marker::PhantomData,
            }),
        }
    }

    pub fn produce(&self) -> BoxActor<A::Msg> {
        self.producer.produce()
    }
}

/// Type-erased producer handed to `Provider` internals that only deal in
/// `BoxActor<Msg>`, never the concrete `A`.
pub type BoxActorProd<Msg> = Arc<dyn Fn() -> BoxActor<Msg> + Send + Sync>;
