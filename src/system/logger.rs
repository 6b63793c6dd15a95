//! Builds the system's root `slog::Logger`: a terminal drain formatted per
//! `LogConfig`, filtered to the configured level, fed through `slog-async`
//! so logging from a dispatcher worker never blocks it on I/O.

use slog::Drain;

use crate::config::LogConfig;

fn parse_level(level: &str) -> slog::Level {
    match level.to_ascii_lowercase().as_str() {
        "critical" => slog::Level::Critical,
        "error" => slog::Level::Error,
        "warning" | "warn" => slog::Level::Warning,
        "info" => slog::Level::Info,
        "trace" => slog::Level::Trace,
        _ => slog::Level::Debug,
    }
}

pub fn build_logger(cfg: &LogConfig) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, parse_level(&cfg.level)).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!())
}
