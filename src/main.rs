// Hide console window on Windows release builds
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use peb::desktop::{Desktop, SystemDesktop};
use peb::headless::HeadlessFrames;
use peb::{Shell, ShellError, cli, logging, privilege};
use peb_config::{Config, SettingsStore, WindowSize};
use tokio::runtime::Runtime;

/// Report a fatal error the way the user sees it and exit non-zero.
fn fatal(err: &ShellError) -> ! {
    log::error!("{}", err);
    eprintln!("peb: error: {err}");
    SystemDesktop.show_error(err.title(), &err.to_string());
    std::process::exit(1);
}

fn main() -> Result<()> {
    let options = match cli::process_cli() {
        cli::CliResult::Exit(code) => std::process::exit(code),
        cli::CliResult::Continue(options) => options,
    };
    logging::init_log_bridge(options.log_level);
    log::info!("Starting peb {}", peb::VERSION);

    if let Err(e) = privilege::check() {
        fatal(&e);
    }

    let mut config = Config::load(options.ini.as_deref()).unwrap_or_else(|e| fatal(&e.into()));
    if options.fullscreen {
        config.gui.window_size = WindowSize::Fullscreen;
    }
    if let Some(path) = logging::configure(&config.logging, &config.log_dir()) {
        log::info!("Logging to {:?}", path);
    }

    let runtime = Arc::new(Runtime::new()?);
    let settings = SettingsStore::new(&config);
    let frames = Box::new(HeadlessFrames::new(std::io::stdout()));
    let mut shell = Shell::new(
        config,
        settings,
        runtime.handle().clone(),
        frames,
        Box::new(SystemDesktop),
    )
    .unwrap_or_else(|e| fatal(&e));

    if let Err(e) = shell.start() {
        shell.shutdown();
        fatal(&e);
    }

    // One URL per line on stdin, each treated as a link in the main frame.
    let (lines_tx, mut lines_rx) = tokio::sync::mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("peb-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if lines_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    shell.run(&mut lines_rx);
    drop(shell);

    log::info!("Shell exited, shutting down runtime");
    if let Some(runtime) = Arc::into_inner(runtime) {
        runtime.shutdown_timeout(Duration::from_secs(2));
    }
    Ok(())
}
