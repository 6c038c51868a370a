use chrono::Local;
use slog::Drain;
use std::io;

/// Where a process's log lines go.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogTarget {
    Stdout,
    // Worker stdout carries the message channel, so workers log here.
    Stderr,
}

/// Builds the root logger for this process. Every line is tagged with `role`.
pub fn create_root_logger(role: String, target: LogTarget) -> slog::Logger {
    let decorator = match target {
        LogTarget::Stdout => slog_term::TermDecorator::new().stdout().build(),
        LogTarget::Stderr => slog_term::TermDecorator::new().stderr().build(),
    };
    let drain = slog_term::FullFormat::new(decorator)
        .use_custom_timestamp(timestamp)
        .build()
        .fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("role" => role))
}

fn timestamp(io: &mut dyn io::Write) -> io::Result<()> {
    write!(io, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"))
}
