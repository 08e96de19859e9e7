#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the per-run progress log initializer, and a minimal test initializer.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Path of the append-only log file for a run stamped `run_stamp` (e.g. `20260221_093015`).
pub fn run_log_path(log_dir: &Path, run_stamp: &str) -> PathBuf {
    log_dir.join(format!("harvest_{run_stamp}.log"))
}

/// Install the progress log: terminal output plus an append-only per-run file.
///
/// Logging is best-effort. If the file cannot be opened a warning goes to stderr
/// and only the terminal sink is installed. Returns the file path only when the
/// file sink was actually installed; `None` if a global logger already existed.
pub fn init_run_logger(log_dir: &Path, run_stamp: &str, level: LevelFilter) -> Option<PathBuf> {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    let log_path = run_log_path(log_dir, run_stamp);
    let file_in_use = match open_append(&log_path) {
        Ok(file) => {
            loggers.push(WriteLogger::new(level, config, file));
            Some(log_path)
        }
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", log_path, err);
            None
        }
    };

    // A logger may already be installed (tests, embedding); keep it.
    match CombinedLogger::init(loggers) {
        Ok(()) => file_in_use,
        Err(_) => None,
    }
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_log_path_is_stamped() {
        let path = run_log_path(Path::new("data/logs"), "20260221");
        assert_eq!(path, PathBuf::from("data/logs/harvest_20260221.log"));
    }

    #[test]
    fn no_log_file_reported_when_a_logger_is_already_installed() {
        initialize_for_tests();
        let temp = tempfile::TempDir::new().unwrap();

        let installed = init_run_logger(temp.path(), "20260221_093015", LevelFilter::Info);
        assert_eq!(installed, None);
    }

    #[test]
    fn open_append_creates_directory_and_keeps_existing_lines() {
        use std::io::Write;

        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("harvest_x.log");
        {
            let mut file = open_append(&path).unwrap();
            writeln!(file, "first").unwrap();
        }
        {
            let mut file = open_append(&path).unwrap();
            writeln!(file, "second").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
