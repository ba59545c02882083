//! Logging setup for the codesign binary.
//!
//! Library code only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. The binary installs one with [`init`]:
//!
//! - **Console**: compact, to stderr, so stdout stays clean for results
//! - **Files** (optional): daily rotation in the platform data directory,
//!   10 files retained
//! - **Filter**: `RUST_LOG` wins; otherwise the verbosity picks the level
//!
//! ```no_run
//! use codesign::logging::{self, LogOptions};
//!
//! logging::init(&LogOptions { verbosity: 1, log_to_file: false })?;
//! tracing::info!("ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// How the binary wants to log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// 0 = warnings, 1 = info, 2+ = debug
    pub verbosity: u8,
    /// Also write rotating log files under [`get_log_dir`]
    pub log_to_file: bool,
}

impl LogOptions {
    fn default_directive(self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/codesign/logs`
/// - macOS: `~/Library/Application Support/codesign/logs`
/// - Linux: `~/.local/share/codesign/logs`
///
/// # Errors
///
/// Returns error if the data directory is unknown or cannot be created
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;

    let log_dir = base_dir.join("codesign").join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns error if the filter is invalid or the file appender fails
pub fn init(options: &LogOptions) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(options.default_directive()))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = if options.log_to_file {
        let log_dir = get_log_dir()?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(10)
            .filename_prefix("codesign")
            .filename_suffix("log")
            .build(&log_dir)
            .context("Failed to create log file appender")?;
        Some(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .with_ansi(false)
                .with_writer(appender),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized: {options:?}");
    Ok(())
}
