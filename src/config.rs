//! Runtime configuration, loaded the way the teacher loads it: a set of
//! built-in defaults layered with an optional TOML file pointed to by an
//! environment variable, merged through the `config` crate rather than a
//! hand-rolled parser.

use std::env;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub log_format: String,
    pub date_format: String,
    pub time_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "debug".into(),
            log_format: "{date} {time} {level} [{module}] {body}".into(),
            date_format: "%Y-%m-%d".into(),
            time_format: "%H:%M:%S%:z".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MailboxConfig {
    /// Maximum user messages processed per mailbox `run()` before the
    /// mailbox re-queues itself, giving sibling actors a turn.
    pub msg_process_limit: u32,
    /// `-1` means unbounded; any value `>= 0` bounds the mailbox at that
    /// many queued user messages.
    pub capacity: i64,
    /// How long `send_msg` retries a full bounded mailbox before giving
    /// up and routing the message to dead letters.
    pub push_timeout_millis: u64,
    /// Wall-clock cap on one mailbox run, regardless of
    /// `msg_process_limit`. `0` disables the cap.
    pub throughput_deadline_millis: u64,
}

impl MailboxConfig {
    pub fn capacity(&self) -> Option<usize> {
        if self.capacity < 0 {
            None
        } else {
            Some(self.capacity as usize)
        }
    }

    pub fn throughput_deadline(&self) -> Option<std::time::Duration> {
        if self.throughput_deadline_millis == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.throughput_deadline_millis))
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        MailboxConfig {
            msg_process_limit: 1000,
            capacity: -1,
            push_timeout_millis: 10_000,
            throughput_deadline_millis: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DispatcherConfig {
    pub pool_size: usize,
    pub stack_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            pool_size: num_cpus::get() * 2,
            stack_size: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SchedulerConfig {
    pub frequency_millis: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            frequency_millis: 50,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub log: LogConfig,
    pub mailbox: MailboxConfig,
    pub dispatcher: DispatcherConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: true,
            log: LogConfig::default(),
            mailbox: MailboxConfig::default(),
            dispatcher: DispatcherConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Loads defaults, then merges `$HIVE_CONF` (falling back to the
/// teacher's own `$RIKER_CONF` for drop-in compatibility) if it points at
/// a readable file. Missing or malformed override files are not fatal --
/// the defaults stand.
pub fn load_config() -> Settings {
    let defaults = Settings::default();

    let path = env::var("HIVE_CONF")
        .or_else(|_| env::var("RIKER_CONF"))
        .unwrap_or_else(|_| "config/hive.toml".into());

    let builder = config::Config::builder()
        .set_default("debug", defaults.debug)
        .and_then(|b| b.set_default("log.level", defaults.log.level.clone()))
        .and_then(|b| b.set_default("log.log_format", defaults.log.log_format.clone()))
        .and_then(|b| b.set_default("log.date_format", defaults.log.date_format.clone()))
        .and_then(|b| b.set_default("log.time_format", defaults.log.time_format.clone()))
        .and_then(|b| {
            b.set_default(
                "mailbox.msg_process_limit",
                defaults.mailbox.msg_process_limit as i64,
            )
        })
        .and_then(|b| b.set_default("mailbox.capacity", defaults.mailbox.capacity))
        .and_then(|b| {
            b.set_default(
                "mailbox.push_timeout_millis",
                defaults.mailbox.push_timeout_millis as i64,
            )
        })
        .and_then(|b| {
            b.set_default(
                "mailbox.throughput_deadline_millis",
                defaults.mailbox.throughput_deadline_millis as i64,
            )
        })
        .and_then(|b| b.set_default("dispatcher.pool_size", defaults.dispatcher.pool_size as i64))
        .and_then(|b| {
            b.set_default(
                "dispatcher.stack_size",
                defaults.dispatcher.stack_size as i64,
            )
        })
        .and_then(|b| {
            b.set_default(
                "scheduler.frequency_millis",
                defaults.scheduler.frequency_millis as i64,
            )
        })
        .map(|b| b.add_source(config::File::with_name(&path).required(false)))
        .and_then(|b| b.build());

    match builder.and_then(|c| c.try_deserialize::<Settings>()) {
        Ok(settings) => settings,
        Err(_) => defaults,
    }
}
