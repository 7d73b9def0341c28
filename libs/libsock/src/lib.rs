//! Socket System Call Library
//!
//! Thin wrappers around the host's socket syscalls. Every wrapper performs
//! exactly one OS call and returns `Result<T, Error>`, so callers can tell
//! which syscall failed and with which errno.
//!
//! # Usage
//!
//! ```rust,no_run
//! use libsock::socket::{self, SockAddrIn};
//!
//! let fd = socket::tcp_socket()?;
//! socket::connect_inet(fd.fd(), &SockAddrIn::new([127, 0, 0, 1], 2000))?;
//! socket::send(fd.fd(), b"hello")?;
//! # Ok::<(), libsock::Error>(())
//! ```

pub use errno::Errno;
pub use error::Error;
pub use types::*;

pub mod dns;
pub mod errno;
pub mod error;
pub mod io;
pub mod socket;
pub mod tcp_info;
pub mod types;
