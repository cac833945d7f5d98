// src/utils/logger.rs

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGER: ConsoleLogger = ConsoleLogger;
static WITH_TARGET: AtomicBool = AtomicBool::new(false);

/// Writes log records to stderr, one tagged line per record.
struct ConsoleLogger;

/// Installs the console logger. `verbosity` 0 = warnings, 1 = info, 2 = debug, 3+ = trace.
///
/// At debug level and above each line also carries the module the record came from.
pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    WITH_TARGET.store(level >= LevelFilter::Debug, Ordering::Relaxed);

    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

fn tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warn ",
        Level::Info => "info ",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        // A closed stderr is not worth failing the comparison over
        let _ = if WITH_TARGET.load(Ordering::Relaxed) {
            writeln!(out, "[{}] {}: {}", tag(record.level()), record.target(), record.args())
        } else {
            writeln!(out, "[{}] {}", tag(record.level()), record.args())
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_have_equal_width() {
        for level in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace] {
            assert_eq!(tag(level).len(), 5);
        }
    }
}
