/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Verwatch Logging Module
//!
//! Diagnostics for the version checker go to stderr through the `log` facade so
//! that user-facing reports on stdout stay clean.
//!
//! ## Usage
//!
//! ```
//! verwatch_utils::logging::init_with_format("info", "text").expect("logger");
//! log::info!("checking 12 services");
//! verwatch_utils::logging::update_log_level("debug").expect("level");
//! ```
//!
//! ## Log Levels
//!
//! "off", "error", "warn", "info" (default), "debug" and "trace". Unknown names
//! resolve to "info".
//!
//! ## Formats
//!
//! - "text": `2025-01-01 12:00:00 - INFO [target]: message`
//! - "json": one object per line with timestamp, level, target, message, module, file, line

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use log::{debug, error, info, trace, warn};

static LOGGER: VerwatchLogger = VerwatchLogger;
static CURRENT_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Info as usize);
static JSON_FORMAT: AtomicBool = AtomicBool::new(false);
static INSTALLED: OnceCell<Result<(), String>> = OnceCell::new();

/// Process-wide logger writing diagnostics to stderr
pub struct VerwatchLogger;

impl VerwatchLogger {
    fn current_level() -> LevelFilter {
        level_filter_from_usize(CURRENT_LEVEL.load(Ordering::Relaxed))
    }

    fn render(record: &Record) -> String {
        if JSON_FORMAT.load(Ordering::Relaxed) {
            serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string().to_lowercase(),
                "target": record.target(),
                "message": record.args().to_string(),
                "module": record.module_path(),
                "file": record.file(),
                "line": record.line()
            })
            .to_string()
        } else {
            format!(
                "{} - {} [{}]: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        }
    }
}

impl log::Log for VerwatchLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Self::current_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Self::render(record));
        }
    }

    fn flush(&self) {}
}

/// Initializes the logger with the given level and text output.
pub fn init(level: &str) -> Result<(), SetLoggerError> {
    init_with_format(level, "text")
}

/// Initializes the logger with the given level and output format.
///
/// Installing the logger happens once per process. Later calls only adjust the
/// level and the format, so tests and the CLI may call this freely.
///
/// # Arguments
/// * `level` - Log level name ("debug", "info", "warn", "error", ...)
/// * `format` - "text" for human-readable lines, "json" for structured output
pub fn init_with_format(level: &str, format: &str) -> Result<(), SetLoggerError> {
    let level_filter = str_to_level_filter(level);

    // A foreign logger may already be installed; in that case we still honour the level.
    INSTALLED.get_or_init(|| log::set_logger(&LOGGER).map_err(|e| e.to_string()));

    JSON_FORMAT.store(format.eq_ignore_ascii_case("json"), Ordering::Relaxed);
    CURRENT_LEVEL.store(level_filter as usize, Ordering::Relaxed);
    log::set_max_level(level_filter);
    Ok(())
}

/// Updates the current log level at runtime.
pub fn update_log_level(level: &str) -> Result<(), String> {
    let new_level = str_to_level_filter(level);
    CURRENT_LEVEL.store(new_level as usize, Ordering::Relaxed);
    log::set_max_level(new_level);
    Ok(())
}

fn str_to_level_filter(level: &str) -> LevelFilter {
    level
        .trim()
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info)
}

fn level_filter_from_usize(v: usize) -> LevelFilter {
    match v {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        5 => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

pub mod prelude {
    pub use log::{debug, error, info, trace, warn};
}
