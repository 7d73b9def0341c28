//! Descriptor-level I/O: poll, file status flags and queue ioctls

use crate::error::Error;
use crate::types::Fd;

/// Poll event bits
pub mod poll_events {
    pub const POLLIN: i16 = libc::POLLIN;
    pub const POLLPRI: i16 = libc::POLLPRI;
    pub const POLLOUT: i16 = libc::POLLOUT;
    pub const POLLERR: i16 = libc::POLLERR;
    pub const POLLHUP: i16 = libc::POLLHUP;
    pub const POLLNVAL: i16 = libc::POLLNVAL;
    /// Peer closed its write side (Linux only; 0 elsewhere)
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const POLLRDHUP: i16 = libc::POLLRDHUP;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub const POLLRDHUP: i16 = 0;
}

/// One entry of the `poll` descriptor set (layout matches `struct pollfd`)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PollFd {
    pub fd: i32,
    pub events: i16,
    pub revents: i16,
}

impl PollFd {
    pub fn new(fd: Fd, events: i16) -> Self {
        PollFd {
            fd: fd.raw(),
            events,
            revents: 0,
        }
    }
}

/// Wait for events on a set of descriptors
///
/// # Arguments
/// * `fds` - Descriptors and requested events; `revents` is filled in
/// * `timeout_ms` - 0 returns at once, negative waits forever
///
/// # Returns
/// Number of descriptors with non-zero `revents`; 0 on timeout
pub fn poll(fds: &mut [PollFd], timeout_ms: i32) -> Result<usize, Error> {
    let ret = unsafe {
        libc::poll(
            fds.as_mut_ptr() as *mut libc::pollfd,
            fds.len() as libc::nfds_t,
            timeout_ms,
        )
    };
    Error::from_ret(ret).map(|n| n as usize)
}

/// File status flag bits
pub mod status_flags {
    pub const O_NONBLOCK: i32 = libc::O_NONBLOCK;
}

fn status_flags(fd: Fd) -> Result<i32, Error> {
    Error::from_ret(unsafe { libc::fcntl(fd.raw(), libc::F_GETFL, 0) })
}

/// Toggle O_NONBLOCK on a descriptor
pub fn set_nonblocking(fd: Fd, on: bool) -> Result<(), Error> {
    let flags = status_flags(fd)?;
    let flags = if on {
        flags | status_flags::O_NONBLOCK
    } else {
        flags & !status_flags::O_NONBLOCK
    };
    Error::from_ret(unsafe { libc::fcntl(fd.raw(), libc::F_SETFL, flags) }).map(|_| ())
}

pub fn is_nonblocking(fd: Fd) -> Result<bool, Error> {
    status_flags(fd).map(|flags| flags & status_flags::O_NONBLOCK != 0)
}

/// Bytes queued for reading (FIONREAD / SIOCINQ)
pub fn bytes_readable(fd: Fd) -> Result<usize, Error> {
    let mut n: libc::c_int = 0;
    let ret = unsafe { libc::ioctl(fd.raw(), libc::FIONREAD, &mut n as *mut libc::c_int) };
    Error::from_ret(ret).map(|_| n as usize)
}

/// Bytes written but not yet acknowledged by the peer (SIOCOUTQ)
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn bytes_unsent(fd: Fd) -> Result<usize, Error> {
    let mut n: libc::c_int = 0;
    let ret = unsafe { libc::ioctl(fd.raw(), libc::TIOCOUTQ, &mut n as *mut libc::c_int) };
    Error::from_ret(ret).map(|_| n as usize)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn bytes_unsent(_fd: Fd) -> Result<usize, Error> {
    Err(Error::Os(crate::Errno::ENOPROTOOPT))
}
