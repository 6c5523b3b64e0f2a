//! Logging setup for binaries embedding the access-control layer.
//!
//! Library code only uses the `log` facade. `RUST_LOG` takes precedence over the configured
//! level so operators can raise verbosity per module without touching the config file.

use std::str::FromStr;

/// Initialize `env_logger` with `level` as the default filter.
///
/// Returns false if a logger was already installed.
pub fn init(level: &str) -> bool {
    let default_level = log::LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using info", level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.try_init().is_ok()
}

fn test_logger() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Warn)
        .filter_module("datafold_acl", log::LevelFilter::Debug)
        .is_test(true);
    builder
}

/// Install a test logger once per process. Debug output is limited to this crate.
pub fn init_test_logging() {
    let _ = test_logger().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    use log::{Level, Log, Metadata};

    fn enabled(logger: &env_logger::Logger, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn test_test_logger_limits_debug_to_this_crate() {
        let logger = test_logger().build();

        assert!(enabled(&logger, "datafold_acl::permissions::resolver", Level::Debug));
        assert!(!enabled(&logger, "sled::pagecache", Level::Debug));
        assert!(!enabled(&logger, "sled::pagecache", Level::Info));
        assert!(enabled(&logger, "sled::pagecache", Level::Warn));
    }

    #[test]
    fn test_second_init_reports_existing_logger() {
        init_test_logging();
        assert!(!init("warn"));
    }
}
