//! Operating-system services: dialogs, notifications, opening URLs and
//! launching external programs.
//!
//! [`SystemDesktop`] is the real implementation; tests substitute their own
//! [`Desktop`].

use std::io;
use std::path::{Path, PathBuf};

const NOTIFICATION_TIMEOUT_MS: u32 = 3000;
const APP_NAME: &str = "Perl Executing Browser";

pub trait Desktop {
    /// Open a URL in the default browser, or a file with its default handler.
    fn open_url(&self, url: &str) -> io::Result<()>;

    /// Start an external program detached from the shell.
    fn launch(&self, command: &str) -> io::Result<()>;

    /// Transient tray-style notification.
    fn notify(&self, title: &str, message: &str);

    /// Ask for an existing file. `None` when the dialog is cancelled.
    fn pick_file(&self, title: &str, start_dir: &Path) -> Option<PathBuf>;

    /// Ask for an existing directory. `None` when the dialog is cancelled.
    fn pick_folder(&self, title: &str, start_dir: &Path) -> Option<PathBuf>;

    /// Ask for a file name to create. `None` when the dialog is cancelled.
    fn pick_save_file(&self, title: &str, start_dir: &Path) -> Option<PathBuf>;

    /// Blocking error dialog.
    fn show_error(&self, title: &str, message: &str);
}

/// Split an `external:` command line into program and arguments.
///
/// Quoting follows POSIX shell rules but no shell is involved, so
/// metacharacters are passed through literally.
pub fn parse_command_line(command: &str) -> io::Result<(String, Vec<String>)> {
    let mut words = shell_words::split(command)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        .into_iter();
    let program = words
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    Ok((program, words.collect()))
}

/// Escape a string for safe embedding inside an AppleScript double-quoted string.
#[cfg(target_os = "macos")]
fn escape_for_applescript(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDesktop;

impl Desktop for SystemDesktop {
    fn open_url(&self, url: &str) -> io::Result<()> {
        log::info!("Opening with default application: {}", url);
        open::that(url)
    }

    fn launch(&self, command: &str) -> io::Result<()> {
        let (program, args) = parse_command_line(command)?;
        log::info!("External application: {} {:?}", program, args);
        let mut child = std::process::Command::new(&program)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        // Reap it whenever it exits.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }

    fn notify(&self, title: &str, message: &str) {
        let title = if title.is_empty() { APP_NAME } else { title };

        #[cfg(not(target_os = "macos"))]
        {
            if let Err(e) = notify_rust::Notification::new()
                .appname(APP_NAME)
                .summary(title)
                .body(message)
                .timeout(notify_rust::Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
                .show()
            {
                log::warn!("Failed to send desktop notification: {}", e);
            }
        }

        #[cfg(target_os = "macos")]
        {
            let _ = NOTIFICATION_TIMEOUT_MS;
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                escape_for_applescript(message),
                escape_for_applescript(title),
            );
            if let Err(e) = std::process::Command::new("osascript")
                .arg("-e")
                .arg(&script)
                .output()
            {
                log::warn!("Failed to send macOS desktop notification: {}", e);
            }
        }
    }

    fn pick_file(&self, title: &str, start_dir: &Path) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .set_directory(start_dir)
            .pick_file()
    }

    fn pick_folder(&self, title: &str, start_dir: &Path) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .set_directory(start_dir)
            .pick_folder()
    }

    fn pick_save_file(&self, title: &str, start_dir: &Path) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .set_directory(start_dir)
            .save_file()
    }

    fn show_error(&self, title: &str, message: &str) {
        log::error!("{}: {}", title, message);
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Error)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}
