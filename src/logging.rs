//! File-backed `log` bridge.
//!
//! [`init_log_bridge`] installs the global logger right after argument
//! parsing so that every later `log::info!()` and friends are captured. At
//! that point there is no log file yet; records only reach stderr when
//! `RUST_LOG` is set. Once the settings file is loaded, [`configure`] opens
//! the log file named by the `logging` section:
//!
//! - `none`: no file.
//! - `single_file`: append to `<directory>/<prefix>.log`.
//! - `per_session`: create `<directory>/<prefix>-<YYYYMMDD-HHMMSS>.log`.
//!
//! Level precedence: `--log-level`, then `RUST_LOG`, then the settings file.

use chrono::Local;
use parking_lot::Mutex;
use peb_config::{LogLevel, LogMode, LoggingConfig};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

struct LogTarget {
    file: Option<File>,
    mirror_stderr: bool,
}

struct FileLogger {
    target: Mutex<LogTarget>,
}

static LOGGER: OnceLock<FileLogger> = OnceLock::new();

/// Whether the level came from the command line and must not be replaced.
static LEVEL_PINNED: OnceLock<bool> = OnceLock::new();

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        let mut target = self.target.lock();
        if let Some(file) = target.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
        if target.mirror_stderr {
            eprint!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(file) = self.target.lock().file.as_mut() {
            let _ = file.flush();
        }
    }
}

fn rust_log_level() -> Option<LogLevel> {
    std::env::var("RUST_LOG").ok()?.parse().ok()
}

/// Install the global logger. Safe to call more than once.
pub fn init_log_bridge(cli_level: Option<LogLevel>) {
    let mirror_stderr = std::env::var_os("RUST_LOG").is_some();
    let logger = LOGGER.get_or_init(|| FileLogger {
        target: Mutex::new(LogTarget {
            file: None,
            mirror_stderr,
        }),
    });
    if log::set_logger(logger).is_err() {
        return;
    }
    let _ = LEVEL_PINNED.set(cli_level.is_some() || rust_log_level().is_some());
    let level = cli_level
        .or_else(rust_log_level)
        .unwrap_or(LogLevel::Info);
    log::set_max_level(level.to_level_filter());
}

/// Log file path for `config` below `dir`, or `None` for [`LogMode::None`].
pub fn log_file_path(config: &LoggingConfig, dir: &Path) -> Option<PathBuf> {
    match config.mode {
        LogMode::None => None,
        LogMode::SingleFile => Some(dir.join(format!("{}.log", config.prefix))),
        LogMode::PerSession => Some(dir.join(format!(
            "{}-{}.log",
            config.prefix,
            Local::now().format("%Y%m%d-%H%M%S")
        ))),
    }
}

/// Open the log file described by the settings file.
///
/// Returns the path of the opened file. Failure to open it is logged to
/// stderr and otherwise ignored.
pub fn configure(config: &LoggingConfig, dir: &Path) -> Option<PathBuf> {
    if !LEVEL_PINNED.get().copied().unwrap_or(false) {
        log::set_max_level(config.level.to_level_filter());
    }
    let logger = LOGGER.get()?;
    let path = log_file_path(config, dir)?;

    let opened = std::fs::create_dir_all(dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(config.mode == LogMode::SingleFile)
            .write(true)
            .truncate(config.mode == LogMode::PerSession)
            .open(&path)
    });
    match opened {
        Ok(mut file) => {
            let _ = writeln!(
                file,
                "{}\npeb v.{} started at {}\n{}",
                "=".repeat(60),
                env!("CARGO_PKG_VERSION"),
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                "=".repeat(60)
            );
            logger.target.lock().file = Some(file);
            Some(path)
        }
        Err(e) => {
            eprintln!("peb: cannot open log file {}: {}", path.display(), e);
            None
        }
    }
}
