//! Refusal to run with administrative privileges.

use crate::error::ShellError;

/// Whether the process runs as the superuser.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Elevation is not detected on this platform.
#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}

/// Fail with [`ShellError::PrivilegeViolation`] when running elevated.
pub fn check() -> Result<(), ShellError> {
    if is_elevated() {
        log::error!("Started with administrative privileges");
        return Err(ShellError::PrivilegeViolation);
    }
    Ok(())
}
