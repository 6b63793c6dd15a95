//! `ActorSystem`'s logging facade: each `log_*` call both writes through
//! `slog` and publishes a matching `LogEvent` on the log channel, and a
//! `SystemBuilder` with custom `Settings` boots and shuts down cleanly.

mod support;

use std::time::Duration;

use hive_rt::actors::*;
use hive_rt::config::Settings;
use support::probe;

#[test]
fn log_calls_publish_matching_events_on_the_log_channel() {
    let system = ActorSystem::new().expect("system");

    let (tx, rx) = probe::<LogEvent>();
    let sub = system
        .sys_actor_of(Props::<support::Probe<LogEvent>>::args(tx), "log-sub")
        .expect("subscriber");
    system.log_channel().send_msg(
        ChannelMsg::Subscribe(Subscribe { topic: All.into(), subscriber: sub.box_clone() }),
        None,
    );

    system.log_debug("test", "debug message");
    match rx.recv_timeout(Duration::from_secs(2)).expect("no debug event") {
        LogEvent::Debug { source, text } => {
            assert_eq!(source, "test");
            assert_eq!(text, "debug message");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    system.log_warning("test", "warning message");
    match rx.recv_timeout(Duration::from_secs(2)).expect("no warning event") {
        LogEvent::Warning { source, text } => {
            assert_eq!(source, "test");
            assert_eq!(text, "warning message");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    system.log_error("test", "error message", None);
    match rx.recv_timeout(Duration::from_secs(2)).expect("no error event") {
        LogEvent::Error { source, text, .. } => {
            assert_eq!(source, "test");
            assert_eq!(text, "error message");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn system_builder_accepts_custom_settings() {
    let mut settings = Settings::default();
    settings.log.level = "trace".into();

    let system = SystemBuilder::new()
        .name("logger-test-system")
        .settings(settings)
        .create()
        .expect("system with custom settings");

    system.log_debug("startup", "system booted with custom settings");
    system.shutdown();
}
