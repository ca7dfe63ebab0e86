//! Subscriber setup: stderr plus one log file per invocation.

use chrono::{DateTime, Local};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_FILE_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

pub fn log_level(name: &str) -> Level {
    match name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("{}.log", now.format(LOG_FILE_FORMAT))
}

/// Install the global subscriber. The returned guard flushes the file writer
/// when dropped, so it must live until the end of `main`.
pub fn init(level: Level, log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let (file_writer, guard) = non_blocking(rolling::never(log_dir, log_file_name(Local::now())));

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_named_after_start_time() {
        let now = Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(log_file_name(now), "03_09_2025_14_05_07.log");
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        assert_eq!(log_level("debug"), Level::DEBUG);
        assert_eq!(log_level("loud"), Level::INFO);
    }
}
