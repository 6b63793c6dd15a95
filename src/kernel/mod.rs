//! Mailboxes, dispatchers, and the `Provider` that wires a freshly
//! produced actor instance to both.

mod cell_runtime;
mod dispatcher;
mod mailbox;
mod provider;

pub use self::dispatcher::{BalancingDispatcher, Dispatcher, Job, PinnedDispatcher, StandardDispatcher};
pub use self::mailbox::{mailbox, run_mailbox, Envelope, MailboxSender, MailboxState};
pub use self::provider::Provider;
