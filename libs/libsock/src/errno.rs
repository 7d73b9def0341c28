//! POSIX errno values
//!
//! Unlike a fixed enum, the host may hand back any code, so `Errno` wraps the
//! raw value and names the ones callers match on.

use std::ffi::CStr;
use std::fmt;

/// Error number reported by a failed syscall
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Errno(i32);

impl Errno {
    /// Interrupted system call
    pub const EINTR: Errno = Errno(libc::EINTR);
    /// Bad file descriptor
    pub const EBADF: Errno = Errno(libc::EBADF);
    /// Resource temporarily unavailable
    pub const EAGAIN: Errno = Errno(libc::EAGAIN);
    /// Operation would block
    pub const EWOULDBLOCK: Errno = Errno(libc::EWOULDBLOCK);
    /// Invalid argument
    pub const EINVAL: Errno = Errno(libc::EINVAL);
    /// Broken pipe
    pub const EPIPE: Errno = Errno(libc::EPIPE);
    /// Cannot allocate memory
    pub const ENOMEM: Errno = Errno(libc::ENOMEM);
    /// Protocol not available
    pub const ENOPROTOOPT: Errno = Errno(libc::ENOPROTOOPT);
    /// Software caused connection abort
    pub const ECONNABORTED: Errno = Errno(libc::ECONNABORTED);
    /// Connection reset by peer
    pub const ECONNRESET: Errno = Errno(libc::ECONNRESET);
    /// Transport endpoint is already connected
    pub const EISCONN: Errno = Errno(libc::EISCONN);
    /// Transport endpoint is not connected
    pub const ENOTCONN: Errno = Errno(libc::ENOTCONN);
    /// Connection refused
    pub const ECONNREFUSED: Errno = Errno(libc::ECONNREFUSED);

    pub const fn from_raw(raw: i32) -> Self {
        Errno(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// The errno left behind by the most recent failed libc call on this thread.
    pub fn last() -> Self {
        Errno(
            std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO),
        )
    }

    /// `EAGAIN`/`EWOULDBLOCK`, i.e. a non-blocking call with nothing to do.
    pub fn would_block(self) -> bool {
        self == Self::EAGAIN || self == Self::EWOULDBLOCK
    }

    /// Failures of a single pending connection, not of the listening socket;
    /// `accept` can be retried at once.
    pub fn is_transient_accept(self) -> bool {
        self.would_block() || self == Self::ECONNABORTED || self.0 == libc::EPROTO
    }

    /// Human-readable message from the C library (`strerror`).
    pub fn message(self) -> String {
        let mut buf = [0 as libc::c_char; 128];
        let ret = unsafe { libc::strerror_r(self.0, buf.as_mut_ptr(), buf.len()) };
        if ret != 0 {
            return format!("Unknown error {}", self.0);
        }
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Debug for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errno({})", self.0)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.0, self.message())
    }
}
