//! Classify OS errors from spawning or moving files into retry kinds.

use std::io;

use super::policy::ErrorKind;

#[cfg(unix)]
fn is_transient_os_code(code: i32) -> bool {
    // Text file busy (binary still open for writing), device busy, and the
    // access-denied a scanner produces while it holds the file.
    code == libc::ETXTBSY || code == libc::EBUSY || code == libc::EACCES
}

#[cfg(windows)]
fn is_transient_os_code(code: i32) -> bool {
    const ERROR_ACCESS_DENIED: i32 = 5;
    const ERROR_SHARING_VIOLATION: i32 = 32;
    const ERROR_LOCK_VIOLATION: i32 = 33;
    matches!(
        code,
        ERROR_ACCESS_DENIED | ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION
    )
}

#[cfg(not(any(unix, windows)))]
fn is_transient_os_code(_code: i32) -> bool {
    false
}

/// Busy/locked/access-denied failures are transient; everything else is fatal.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    if e.kind() == io::ErrorKind::PermissionDenied {
        return ErrorKind::Transient;
    }
    match e.raw_os_error() {
        Some(code) if is_transient_os_code(code) => ErrorKind::Transient,
        _ => ErrorKind::Fatal,
    }
}
