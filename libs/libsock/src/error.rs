//! Unified error type for libsock operations.
//!
//! All public functions in libsock return `Result<T, Error>` for consistent
//! error handling. Use the `?` operator freely across modules.

use crate::errno::Errno;

/// Unified error type for libsock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A POSIX errno from a failed syscall.
    Os(Errno),
    /// The peer closed its write side before the requested data arrived.
    Eof,
}

impl Error {
    /// Convert a raw libc return value to `Result`.
    ///
    /// libc returns -1 and leaves the reason in `errno` on failure.
    /// Non-negative values indicate success.
    #[inline]
    pub fn from_syscall(ret: isize) -> Result<usize, Error> {
        if ret < 0 {
            Err(Error::Os(Errno::last()))
        } else {
            Ok(ret as usize)
        }
    }

    /// Same as [`Error::from_syscall`] for calls returning `c_int`.
    #[inline]
    pub fn from_ret(ret: libc::c_int) -> Result<libc::c_int, Error> {
        if ret < 0 {
            Err(Error::Os(Errno::last()))
        } else {
            Ok(ret)
        }
    }

    /// The errno, when the failure came from the OS.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::Os(e) => Some(*e),
            Error::Eof => None,
        }
    }

    /// Whether this is the given errno.
    pub fn is(&self, errno: Errno) -> bool {
        self.errno() == Some(errno)
    }
}

impl From<Errno> for Error {
    fn from(e: Errno) -> Self {
        Error::Os(e)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Os(e) => write!(f, "{}", e),
            Error::Eof => write!(f, "connection closed by peer"),
        }
    }
}

impl std::error::Error for Error {}
