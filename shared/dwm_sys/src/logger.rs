//! Stderr logger with per-level colors.

use std::io::Write;

use log::{Level, LevelFilter, Log};
use owo_colors::OwoColorize;

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = record.level();
        let tag = format!("{level:5}");
        let tag: &dyn std::fmt::Display = match level {
            Level::Error => &tag.bright_red(),
            Level::Warn => &tag.bright_yellow(),
            Level::Info => &tag.bright_blue(),
            Level::Debug => &tag.bright_cyan(),
            Level::Trace => &tag.bright_magenta(),
        };
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{tag} {}: {}", record.target().dimmed(), record.args());
    }

    fn flush(&self) {}
}

/// Installs the logger. Level comes from `DWM_LOG` (`error`..`trace`) when
/// set, `info` otherwise. Safe to call more than once; later calls lose.
pub fn init() {
    let level = std::env::var("DWM_LOG")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
