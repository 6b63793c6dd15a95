use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::Rng;

/// A process-unique, opaque identifier assigned to every actor instance.
///
/// Two actors created at the same path at different times get different
/// ids, which is how a stale `ActorRef` held by a dead-letter consumer can
/// be told apart from the live occupant of the same path.
pub type ActorId = u64;

pub(crate) fn new_actor_id() -> ActorId {
    rand::thread_rng().gen()
}

/// The address of an actor: a `/`-separated path rooted at `/`, `/user`,
/// `/system` or `/temp`, plus the instance id of the cell currently
/// (or formerly) occupying it.
///
/// Equality and hashing are defined over the path alone, matching the
/// convention that an `ActorRef` compares equal to another ref for the
/// same address regardless of which generation of the actor it was taken
/// from.
#[derive(Clone)]
pub struct ActorUri {
    pub uid: ActorId,
    pub name: Arc<String>,
    pub path: Arc<String>,
}

impl ActorUri {
    pub fn new(name: &str, path: &str) -> ActorUri {
        ActorUri {
            uid: new_actor_id(),
            name: Arc::new(name.to_string()),
            path: Arc::new(path.to_string()),
        }
    }

    pub fn child(&self, name: &str) -> ActorUri {
        let path = if self.path.ends_with('/') {
            format!("{}{}", self.path, name)
        } else {
            format!("{}/{}", self.path, name)
        };
        ActorUri::new(name, &path)
    }
}

impl PartialEq for ActorUri {
    fn eq(&self, other: &ActorUri) -> bool {
        self.path == other.path
    }
}

impl Eq for ActorUri {}

impl Hash for ActorUri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for ActorUri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl fmt::Debug for ActorUri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ActorUri(path={}, uid={})", self.path, self.uid)
    }
}
