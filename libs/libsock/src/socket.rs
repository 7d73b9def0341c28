//! Socket system call wrappers
//!
//! Provides the TCP/IPv4 calls the session needs: create, bind, listen,
//! accept, connect, send/recv, shutdown, name lookups and socket options.
//!
//! # Example
//!
//! ```rust,no_run
//! use libsock::socket::{self, SockAddrIn};
//!
//! // Listen on port 2000
//! let listener = socket::tcp_socket()?;
//! socket::set_reuse_addr(listener.fd(), true)?;
//! socket::bind_inet(listener.fd(), &SockAddrIn::new([0, 0, 0, 0], 2000))?;
//! socket::listen(listener.fd(), 5)?;
//!
//! // Wait for one client
//! let (conn, peer) = socket::accept(listener.fd())?;
//! println!("accepted {}", peer);
//! socket::send(conn.fd(), b"hi")?;
//! # Ok::<(), libsock::Error>(())
//! ```

use std::fmt;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::Error;
use crate::types::{Fd, OwnedFd};

/// Address family: IPv4
pub const AF_INET: i32 = libc::AF_INET;

/// Socket type: Stream (TCP)
pub const SOCK_STREAM: i32 = libc::SOCK_STREAM;

/// Shutdown how: Stop receiving
pub const SHUT_RD: i32 = libc::SHUT_RD;

/// Shutdown how: Stop sending
pub const SHUT_WR: i32 = libc::SHUT_WR;

/// Shutdown how: Stop both
pub const SHUT_RDWR: i32 = libc::SHUT_RDWR;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = 0;

/// IPv4 socket address (wraps the platform `sockaddr_in`)
#[derive(Clone, Copy)]
pub struct SockAddrIn(libc::sockaddr_in);

impl SockAddrIn {
    /// Create a new socket address
    ///
    /// Port is automatically converted to network byte order.
    pub fn new(addr: [u8; 4], port: u16) -> Self {
        let mut raw: libc::sockaddr_in = unsafe { mem::zeroed() };
        raw.sin_family = AF_INET as libc::sa_family_t;
        raw.sin_port = port.to_be();
        raw.sin_addr = libc::in_addr {
            s_addr: u32::from_ne_bytes(addr),
        };
        SockAddrIn(raw)
    }

    /// The IPv4 address octets
    pub fn addr(&self) -> [u8; 4] {
        self.0.sin_addr.s_addr.to_ne_bytes()
    }

    /// Get the port in host byte order
    pub fn port(&self) -> u16 {
        u16::from_be(self.0.sin_port)
    }

    fn as_ptr(&self) -> *const libc::sockaddr {
        &self.0 as *const libc::sockaddr_in as *const libc::sockaddr
    }

    const LEN: libc::socklen_t = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
}

impl Default for SockAddrIn {
    fn default() -> Self {
        SockAddrIn::new([0; 4], 0)
    }
}

impl From<SocketAddrV4> for SockAddrIn {
    fn from(addr: SocketAddrV4) -> Self {
        SockAddrIn::new(addr.ip().octets(), addr.port())
    }
}

impl From<SockAddrIn> for SocketAddrV4 {
    fn from(addr: SockAddrIn) -> Self {
        SocketAddrV4::new(Ipv4Addr::from(addr.addr()), addr.port())
    }
}

impl fmt::Display for SockAddrIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SocketAddrV4::from(*self))
    }
}

impl fmt::Debug for SockAddrIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SockAddrIn({})", self)
    }
}

// ============================================================================
// Raw Socket Operations (Free Functions)
// ============================================================================

/// Create a socket
///
/// # Arguments
/// * `domain` - Address family (AF_INET for IPv4)
/// * `sock_type` - Socket type (SOCK_STREAM for TCP)
/// * `protocol` - Protocol (0 for default)
pub fn socket(domain: i32, sock_type: i32, protocol: i32) -> Result<OwnedFd, Error> {
    let ret = unsafe { libc::socket(domain, sock_type, protocol) };
    Error::from_ret(ret).map(|raw| OwnedFd::new(Fd::from_raw(raw)))
}

/// Create a blocking IPv4 TCP socket
pub fn tcp_socket() -> Result<OwnedFd, Error> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    let sock_type = SOCK_STREAM | libc::SOCK_CLOEXEC;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let sock_type = SOCK_STREAM;
    socket(AF_INET, sock_type, 0)
}

/// Bind a socket to a local IPv4 address
pub fn bind_inet(fd: Fd, addr: &SockAddrIn) -> Result<(), Error> {
    let ret = unsafe { libc::bind(fd.raw(), addr.as_ptr(), SockAddrIn::LEN) };
    Error::from_ret(ret).map(|_| ())
}

/// Mark a socket as listening for connections
///
/// # Arguments
/// * `fd` - Socket file descriptor (must be bound)
/// * `backlog` - Maximum pending connections
pub fn listen(fd: Fd, backlog: i32) -> Result<(), Error> {
    let ret = unsafe { libc::listen(fd.raw(), backlog) };
    Error::from_ret(ret).map(|_| ())
}

/// Accept a connection on a listening socket
///
/// Blocks unless the listening socket is non-blocking.
///
/// # Returns
/// The connected socket and the address of the peer
pub fn accept(fd: Fd) -> Result<(OwnedFd, SockAddrIn), Error> {
    let mut peer = SockAddrIn::default();
    let mut len = SockAddrIn::LEN;
    let ret = unsafe {
        libc::accept(
            fd.raw(),
            &mut peer.0 as *mut libc::sockaddr_in as *mut libc::sockaddr,
            &mut len,
        )
    };
    let raw = Error::from_ret(ret)?;
    Ok((OwnedFd::new(Fd::from_raw(raw)), peer))
}

/// Connect a socket to a remote IPv4 address
pub fn connect_inet(fd: Fd, addr: &SockAddrIn) -> Result<(), Error> {
    let ret = unsafe { libc::connect(fd.raw(), addr.as_ptr(), SockAddrIn::LEN) };
    Error::from_ret(ret).map(|_| ())
}

/// Send data on a connected socket
///
/// A peer that has gone away yields `EPIPE` instead of raising `SIGPIPE`
/// where the platform supports `MSG_NOSIGNAL`.
///
/// # Returns
/// Number of bytes the kernel accepted, possibly fewer than `buf.len()`
pub fn send(fd: Fd, buf: &[u8]) -> Result<usize, Error> {
    let ret = unsafe {
        libc::send(
            fd.raw(),
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
            SEND_FLAGS,
        )
    };
    Error::from_syscall(ret)
}

/// Receive data from a connected socket
///
/// # Returns
/// Number of bytes received, 0 once the peer has shut its write side
pub fn recv(fd: Fd, buf: &mut [u8]) -> Result<usize, Error> {
    let ret = unsafe {
        libc::recv(
            fd.raw(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            0,
        )
    };
    Error::from_syscall(ret)
}

/// Shutdown a socket connection
///
/// # Arguments
/// * `how` - SHUT_RD (stop receiving), SHUT_WR (stop sending), or SHUT_RDWR (both)
pub fn shutdown(fd: Fd, how: i32) -> Result<(), Error> {
    let ret = unsafe { libc::shutdown(fd.raw(), how) };
    Error::from_ret(ret).map(|_| ())
}

/// Local address the socket is bound to (`getsockname`)
pub fn local_addr(fd: Fd) -> Result<SockAddrIn, Error> {
    let mut addr = SockAddrIn::default();
    let mut len = SockAddrIn::LEN;
    let ret = unsafe {
        libc::getsockname(
            fd.raw(),
            &mut addr.0 as *mut libc::sockaddr_in as *mut libc::sockaddr,
            &mut len,
        )
    };
    Error::from_ret(ret).map(|_| addr)
}

/// Address of the connected peer (`getpeername`)
pub fn peer_addr(fd: Fd) -> Result<SockAddrIn, Error> {
    let mut addr = SockAddrIn::default();
    let mut len = SockAddrIn::LEN;
    let ret = unsafe {
        libc::getpeername(
            fd.raw(),
            &mut addr.0 as *mut libc::sockaddr_in as *mut libc::sockaddr,
            &mut len,
        )
    };
    Error::from_ret(ret).map(|_| addr)
}

// ============================================================================
// Socket Options
// ============================================================================

/// Read an integer socket option
pub fn getsockopt_int(fd: Fd, level: i32, name: i32) -> Result<i32, Error> {
    let mut value: libc::c_int = 0;
    let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
    let ret = unsafe {
        libc::getsockopt(
            fd.raw(),
            level,
            name,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    Error::from_ret(ret).map(|_| value)
}

/// Set an integer socket option
pub fn setsockopt_int(fd: Fd, level: i32, name: i32, value: i32) -> Result<(), Error> {
    let ret = unsafe {
        libc::setsockopt(
            fd.raw(),
            level,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    Error::from_ret(ret).map(|_| ())
}

/// SO_REUSEADDR, so a restarted server can rebind while old connections linger
pub fn set_reuse_addr(fd: Fd, on: bool) -> Result<(), Error> {
    setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, on as i32)
}

/// TCP_NODELAY: `true` disables Nagle's algorithm
pub fn set_nodelay(fd: Fd, on: bool) -> Result<(), Error> {
    setsockopt_int(fd, libc::IPPROTO_TCP, libc::TCP_NODELAY, on as i32)
}

pub fn nodelay(fd: Fd) -> Result<bool, Error> {
    getsockopt_int(fd, libc::IPPROTO_TCP, libc::TCP_NODELAY).map(|v| v != 0)
}

/// SO_DEBUG. Linux requires CAP_NET_ADMIN to turn it on.
pub fn set_debug(fd: Fd, on: bool) -> Result<(), Error> {
    setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_DEBUG, on as i32)
}

pub fn recv_buffer_size(fd: Fd) -> Result<i32, Error> {
    getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_RCVBUF)
}

pub fn send_buffer_size(fd: Fd) -> Result<i32, Error> {
    getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_SNDBUF)
}

/// Fetch and clear the pending socket error (SO_ERROR); 0 when none
pub fn take_error(fd: Fd) -> Result<i32, Error> {
    getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Errno;

    const LOOPBACK: [u8; 4] = [127, 0, 0, 1];

    /// Listening socket on an ephemeral loopback port.
    fn listener() -> (OwnedFd, SockAddrIn) {
        let fd = tcp_socket().unwrap();
        bind_inet(fd.fd(), &SockAddrIn::new(LOOPBACK, 0)).unwrap();
        listen(fd.fd(), 1).unwrap();
        let addr = local_addr(fd.fd()).unwrap();
        (fd, addr)
    }

    fn connected_pair() -> (OwnedFd, OwnedFd) {
        let (server, addr) = listener();
        let client = tcp_socket().unwrap();
        connect_inet(client.fd(), &addr).unwrap();
        let (conn, _) = accept(server.fd()).unwrap();
        (client, conn)
    }

    #[test]
    fn sockaddr_round_trips_through_std() {
        let std_addr: SocketAddrV4 = "10.0.2.15:2000".parse().unwrap();
        let addr = SockAddrIn::from(std_addr);
        assert_eq!(addr.addr(), [10, 0, 2, 15]);
        assert_eq!(addr.port(), 2000);
        assert_eq!(SocketAddrV4::from(addr), std_addr);
        assert_eq!(addr.to_string(), "10.0.2.15:2000");
    }

    #[test]
    fn loopback_send_and_recv() {
        let (client, conn) = connected_pair();
        assert_eq!(send(client.fd(), b"HHH").unwrap(), 3);
        let mut buf = [0u8; 16];
        let n = recv(conn.fd(), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"HHH");
    }

    #[test]
    fn endpoints_mirror_each_other() {
        let (client, conn) = connected_pair();
        let client_local = local_addr(client.fd()).unwrap();
        let conn_peer = peer_addr(conn.fd()).unwrap();
        assert_eq!(client_local.port(), conn_peer.port());
        assert_eq!(conn_peer.addr(), LOOPBACK);
    }

    #[test]
    fn recv_after_peer_shutdown_is_zero() {
        let (client, conn) = connected_pair();
        shutdown(client.fd(), SHUT_WR).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(recv(conn.fd(), &mut buf).unwrap(), 0);
    }

    #[test]
    fn shutdown_unconnected_socket_is_enotconn() {
        let fd = tcp_socket().unwrap();
        let err = shutdown(fd.fd(), SHUT_RDWR).unwrap_err();
        assert!(err.is(Errno::ENOTCONN), "got {}", err);
    }

    #[test]
    fn connect_to_closed_port_is_refused() {
        let (server, addr) = listener();
        drop(server);
        let client = tcp_socket().unwrap();
        let err = connect_inet(client.fd(), &addr).unwrap_err();
        assert!(err.is(Errno::ECONNREFUSED), "got {}", err);
    }

    #[test]
    fn nodelay_toggles() {
        let (client, _conn) = connected_pair();
        set_nodelay(client.fd(), true).unwrap();
        assert!(nodelay(client.fd()).unwrap());
        set_nodelay(client.fd(), false).unwrap();
        assert!(!nodelay(client.fd()).unwrap());
    }

    #[test]
    fn buffer_sizes_are_positive() {
        let fd = tcp_socket().unwrap();
        assert!(recv_buffer_size(fd.fd()).unwrap() > 0);
        assert!(send_buffer_size(fd.fd()).unwrap() > 0);
        assert_eq!(take_error(fd.fd()).unwrap(), 0);
    }
}
