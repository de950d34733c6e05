//! Logging configuration for the flow compiler
//!
//! This module provides utilities for initializing and configuring logging
//! using the `log` and `env_logger` crates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use compiler::logging;
//!
//! // Initialize with default level (Warn)
//! logging::init();
//!
//! // Or initialize from RUST_LOG environment variable
//! logging::init_from_env();
//!
//! // Or initialize with a specific level
//! logging::init_with_level(log::LevelFilter::Debug);
//! ```
//!
//! # Log Levels
//!
//! The compiler uses log levels as follows:
//!
//! - `warn!` - Cleanup anomalies tolerated by the final validator profile
//! - `info!` - High-level progress (passes run)
//! - `debug!` - Per-function validation, fixup rewrites
//! - `trace!` - Per-block traversal
//!
//! # Environment Variable
//!
//! Set `RUST_LOG` to control logging at runtime:
//!
//! ```bash
//! RUST_LOG=warn ./flowc validate prog.json  # Default, quiet output
//! RUST_LOG=info ./flowc validate prog.json  # Show passes
//! RUST_LOG=debug ./flowc validate prog.json # Per-function detail
//! RUST_LOG=trace ./flowc validate prog.json # Very verbose
//! ```
//!
//! You can also filter by module:
//!
//! ```bash
//! RUST_LOG=compiler::ir::validation=debug ./flowc validate prog.json
//! RUST_LOG=compiler::ir::fixup=debug ./flowc validate prog.json
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging with sensible defaults (Warn level).
///
/// This only initializes once; subsequent calls are no-ops.
/// Use this in binaries and test entry points.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging with a specific level.
///
/// This only initializes once; subsequent calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from the RUST_LOG environment variable.
///
/// If RUST_LOG is not set, defaults to Warn level.
/// This only initializes once; subsequent calls are no-ops.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initialize logging for tests.
///
/// Uses test-friendly output format and suppresses most output unless
/// RUST_LOG is explicitly set.
///
/// # Usage in Tests
///
/// ```rust,ignore
/// #[test]
/// fn test_something() {
///     compiler::logging::init_test();
///     // Test code...
/// }
/// ```
pub fn init_test() {
    // try_init() doesn't panic if already initialized
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

/// Level for a count of `-v` flags on the command line
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize from RUST_LOG when it is set, otherwise from the verbosity.
pub fn init_for_cli(verbose: u8) {
    if std::env::var_os("RUST_LOG").is_some() {
        init_from_env();
    } else {
        init_with_level(level_for_verbosity(verbose));
    }
}

/// Check if logging has been initialized.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
