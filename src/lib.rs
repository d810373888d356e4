//! Perl Executing Browser shell.
//!
//! Renders local HTML through an embedded renderer and, when a navigation
//! targets a script on the local pseudo-domain, runs it with an interpreter
//! and shows its output as the next page.

pub mod app;
pub mod cli;
pub mod desktop;
pub mod error;
pub mod frames;
pub mod headless;
pub mod logging;
pub mod navigation;
pub mod privilege;
pub mod settings_page;
pub mod theme;

pub use app::{Shell, ShellInput, WindowState};
pub use error::ShellError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
