//! Descriptor types used across libsock

use std::os::unix::io::RawFd;

use crate::error::Error;

/// A file descriptor. This is a lightweight copyable handle.
/// For automatic close-on-drop, wrap in `OwnedFd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Fd(RawFd);

impl Fd {
    pub const fn from_raw(raw: RawFd) -> Self {
        Fd(raw)
    }
    pub const fn raw(self) -> RawFd {
        self.0
    }
}

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// A file descriptor with RAII close-on-drop semantics.
#[derive(Debug)]
pub struct OwnedFd(Fd);

impl OwnedFd {
    pub fn new(fd: Fd) -> Self {
        OwnedFd(fd)
    }
    pub fn fd(&self) -> Fd {
        self.0
    }

    /// Consume self and return the raw Fd without closing.
    pub fn into_raw(self) -> Fd {
        let fd = self.0;
        core::mem::forget(self);
        fd
    }

    /// Close now and report the result, instead of silently on drop.
    pub fn close(self) -> Result<(), Error> {
        let fd = self.into_raw();
        Error::from_ret(unsafe { libc::close(fd.raw()) }).map(|_| ())
    }
}

impl Drop for OwnedFd {
    fn drop(&mut self) {
        if unsafe { libc::close(self.0.raw()) } < 0 {
            log::warn!("close({}) on drop failed: {}", self.0.raw(), crate::Errno::last());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Errno;

    fn fd_is_open(fd: Fd) -> bool {
        unsafe { libc::fcntl(fd.raw(), libc::F_GETFD) >= 0 }
    }

    #[test]
    fn explicit_close_reports_success() {
        let owned = crate::socket::tcp_socket().unwrap();
        assert!(fd_is_open(owned.fd()));
        assert_eq!(owned.close(), Ok(()));
    }

    #[test]
    fn into_raw_keeps_descriptor_open() {
        let owned = crate::socket::tcp_socket().unwrap();
        let fd = owned.into_raw();
        assert!(fd_is_open(fd));
        OwnedFd::new(fd).close().unwrap();
    }

    #[test]
    fn closing_a_stale_descriptor_is_ebadf() {
        let err = OwnedFd::new(Fd::from_raw(-1)).close().unwrap_err();
        assert!(err.is(Errno::EBADF));
    }
}
