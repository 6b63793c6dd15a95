//! `ActorSystem`/`SystemBuilder` bootstrap: name validation, the three
//! root guardians actors land under, and shutdown idempotence.

mod support;

use hive_rt::actors::*;
use hive_rt::system::SystemError;

#[test]
fn default_system_uses_the_default_name() {
    let system = ActorSystem::new().expect("system");
    assert_eq!(system.name(), "hive");
}

#[test]
fn custom_names_are_accepted() {
    let system = SystemBuilder::new()
        .name("valid-name.1")
        .create()
        .expect("valid name should be accepted");
    assert_eq!(system.name(), "valid-name.1");
}

#[test]
fn invalid_system_names_are_rejected() {
    for bad in ["/", "*", "/a/b/c", "@", "#", "abc*", ""] {
        let err = SystemBuilder::new()
            .name(bad)
            .create()
            .expect_err(&format!("'{bad}' should have been rejected"));
        assert!(matches!(err, SystemError::InvalidName(_)));
    }
}

struct NoOp;

impl ActorFactory for NoOp {
    fn create() -> Self {
        NoOp
    }
}

impl Actor for NoOp {
    type Msg = ();

    fn recv(&mut self, _ctx: &Context<Self::Msg>, _msg: Self::Msg, _sender: Sender) {}
}

#[test]
fn actors_land_under_their_expected_root() {
    let system = ActorSystem::new().expect("system");

    let user_child = system.actor_of(Props::<NoOp>::new(), "under-user").expect("actor_of");
    assert!(user_child.path().starts_with(&format!("{}/", system.user_root().path())));

    let sys_child = system.sys_actor_of(Props::<NoOp>::new(), "under-system").expect("sys_actor_of");
    assert!(sys_child.path().starts_with(&format!("{}/", system.system_root().path())));

    let temp_child = system.temp_actor_of(Props::<NoOp>::new()).expect("temp_actor_of");
    assert!(temp_child.path().starts_with(&format!("{}/", system.temp_root().path())));

    assert_ne!(system.user_root().path(), system.system_root().path());
    assert_ne!(system.user_root().path(), system.temp_root().path());
}

#[test]
fn shutdown_is_idempotent_and_flips_is_terminating() {
    let system = ActorSystem::new().expect("system");
    let _child = system.actor_of(Props::<NoOp>::new(), "doomed").expect("actor_of");

    assert!(!system.is_terminating());
    system.shutdown();
    assert!(system.is_terminating());

    // Calling it again must not panic or double-stop the guardian tree.
    system.shutdown();
    assert!(system.is_terminating());
}

#[test]
fn print_tree_does_not_panic_on_a_populated_system() {
    let system = ActorSystem::new().expect("system");
    let _a = system.actor_of(Props::<NoOp>::new(), "tree-a").expect("actor_of");
    let _b = system.actor_of(Props::<NoOp>::new(), "tree-b").expect("actor_of");
    system.print_tree();
}
