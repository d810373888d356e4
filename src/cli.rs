//! Command-line interface for peb.
//!
//! Flags override the corresponding settings-file values. `--help` prints the
//! usage text and exits with status 1.

use clap::{ArgAction, CommandFactory, Parser};
use peb_config::LogLevel;
use std::path::PathBuf;

/// peb - Perl Executing Browser
#[derive(Parser, Debug)]
#[command(name = "peb")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Start in fullscreen mode
    #[arg(short = 'F', long)]
    pub fullscreen: bool,

    /// Print this help and exit
    #[arg(short = 'H', long, action = ArgAction::SetTrue)]
    pub help: bool,

    /// Settings file to use instead of the default lookup
    #[arg(short = 'I', long, value_name = "PATH")]
    pub ini: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    value.parse()
}

/// Runtime options passed from CLI to the shell
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeOptions {
    pub fullscreen: bool,
    pub ini: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
}

/// Result of CLI processing
#[derive(Debug, PartialEq)]
pub enum CliResult {
    /// Continue with normal startup
    Continue(RuntimeOptions),
    /// Exit with the given code
    Exit(i32),
}

/// Usage text printed for `--help`.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

/// Process the process's own arguments.
pub fn process_cli() -> CliResult {
    process_args(std::env::args_os())
}

/// Process an explicit argument list; the first item is the program name.
pub fn process_args<I, T>(args: I) -> CliResult
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return CliResult::Exit(e.exit_code());
        }
    };

    if cli.help {
        println!("{}", usage());
        return CliResult::Exit(1);
    }

    CliResult::Continue(RuntimeOptions {
        fullscreen: cli.fullscreen,
        ini: cli.ini,
        log_level: cli.log_level,
    })
}
