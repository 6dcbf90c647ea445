//! Logging setup
//!
//! Everything in the workspace logs through the standard `log` macros. This
//! module installs the process-wide logger once, at startup:
//!
//! - with `RUST_LOG` set, `env_logger` takes over so developers can filter
//!   per module
//! - otherwise a small logger writes one formatted line per record to stderr,
//!   in the level and format from [`LoggingConfig`](crate::config::LoggingConfig)
//!
//! ```rust,no_run
//! use teevexa_core::config::LoggingConfig;
//!
//! teevexa_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("Portal gate starting");
//! ```

pub mod formatter;

pub use formatter::{LogEntry, LogFormat};

use crate::config::LoggingConfig;
use std::io::Write;
use std::str::FromStr;
use std::sync::Once;

/// Accepted level names, lowest verbosity first
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

static INIT: Once = Once::new();

/// Install the logger
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = log::LevelFilter::from_str(&config.level)
        .map_err(|_| anyhow::anyhow!("Invalid log level '{}'", config.level))?;
    let format: LogFormat = config.format.parse()?;

    INIT.call_once(|| {
        let installed = if std::env::var_os("RUST_LOG").is_some() {
            env_logger::Builder::from_default_env().try_init().map_err(anyhow::Error::from)
        } else {
            install(level, format)
        };
        if let Err(e) = installed {
            // Another logger was installed first (tests, embedding application).
            eprintln!("teevexa: logger not installed: {}", e);
        }
    });
    Ok(())
}

fn install(level: log::LevelFilter, format: LogFormat) -> anyhow::Result<()> {
    log::set_boxed_logger(Box::new(GateLogger { level, format }))?;
    log::set_max_level(level);
    Ok(())
}

struct GateLogger {
    level: log::LevelFilter,
    format: LogFormat,
}

impl log::Log for GateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format.format_entry(&LogEntry::from_record(record));
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_logger_respects_level() {
        let logger = GateLogger { level: log::LevelFilter::Warn, format: LogFormat::Human };

        let warn = log::Metadata::builder().level(log::Level::Warn).target("t").build();
        let info = log::Metadata::builder().level(log::Level::Info).target("t").build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }

    #[test]
    fn test_init_rejects_bad_config_and_is_repeatable() {
        let bad = LoggingConfig { level: "chatty".into(), ..LoggingConfig::default() };
        assert!(init_logging(&bad).is_err());

        let config = LoggingConfig { level: "debug".into(), format: "json".into() };
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_level_names_parse() {
        for name in LOG_LEVELS {
            assert!(log::LevelFilter::from_str(name).is_ok(), "{}", name);
        }
    }
}
