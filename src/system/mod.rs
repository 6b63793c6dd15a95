//! The `ActorSystem`: root of the actor tree, owner of the default
//! dispatcher and timer, and home of the event-stream and dead-letter
//! channels every cell is wired to at creation time.

mod logger;
mod system;
mod timer;

use std::error::Error;
use std::fmt;

pub use self::logger::build_logger;
pub use self::system::{ActorSystem, SystemBuilder};
pub use self::timer::{BasicTimer, Timer};

#[derive(Debug)]
pub enum SystemError {
    ModuleFailed(String),
    InvalidName(String),
}

impl Error for SystemError {}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SystemError::ModuleFailed(m) => write!(f, "failed to start actor system module: {}", m),
            SystemError::InvalidName(name) => write!(f, "invalid actor system name: {}", name),
        }
    }
}
