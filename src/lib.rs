#![deny(clippy::all)]
#![allow(clippy::new_ret_no_self)]
#![allow(clippy::large_enum_variant)]

//! An actor runtime: lock-free mailboxes with a system-message-first
//! ordering guarantee, three dispatcher strategies, and Erlang/Akka-style
//! supervision built on plain Rust panics rather than typed exceptions.
//!
//! The pieces: [`actor`] (identity, behavior, `Props` construction, the
//! pub/sub `Channel`), [`kernel`] (mailboxes, dispatchers, the actor
//! creation `Provider`), [`system`] (the `ActorSystem` itself, its
//! timer and logger), [`protocol`] (the control-plane messages that
//! drive lifecycle and supervision) and [`supervision`] (restart
//! strategies and directives).

pub mod actor;
pub mod config;
pub mod error;
pub mod kernel;
pub mod patterns;
pub mod protocol;
pub mod supervision;
pub mod system;
mod uri;
mod validate;

use std::fmt::Debug;

/// Anything that can travel through a mailbox. Blanket-implemented for
/// every type that is `Debug + Clone + Send + 'static` -- there is no
/// runtime behavior attached to the trait itself, it just names the
/// bound every generic actor/message type in this crate carries.
pub trait Message: Debug + Clone + Send + 'static {}
impl<T: Debug + Clone + Send + 'static> Message for T {}

pub use crate::config::{load_config, Settings};

/// Re-exports the pieces most programs need in scope: actor traits and
/// refs, the system handle, the control-plane protocol and supervision
/// types.
pub mod actors {
    pub use crate::actor::*;
    pub use crate::protocol::{DeadLetter, Failure, LogEvent, ReceiveTimeout, SystemEvent, SystemMsg, Terminated};
    pub use crate::supervision::{Decider, Directive, Scope, Strategy};
    pub use crate::system::{ActorSystem, SystemBuilder};
    pub use crate::Message;
}
