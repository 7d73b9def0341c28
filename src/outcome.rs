//! Normalized results of socket operations
//!
//! Every transport operation yields exactly one [`Outcome`]. An outcome
//! carries the [`Op`] that produced it together with byte counts and errno,
//! so it can be rendered without any other context.

use std::net::SocketAddrV4;
use std::time::Duration;

use libsock::dns::{DnsError, DnsResult};
use libsock::io::poll_events::*;
use libsock::Error;

/// How a read treats short data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// One `recv`; whatever is available up to the limit
    BestEffort,
    /// Keep receiving until exactly the limit has arrived
    Exact,
}

/// Direction(s) to shut down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum How {
    Read,
    Write,
    Both,
}

impl How {
    pub fn raw(self) -> i32 {
        match self {
            How::Read => libsock::socket::SHUT_RD,
            How::Write => libsock::socket::SHUT_WR,
            How::Both => libsock::socket::SHUT_RDWR,
        }
    }
}

/// How many counters `introspect` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    Basic,
    Full,
}

/// An operation together with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Create a fresh descriptor
    Socket,
    Connect(SocketAddrV4),
    Accept,
    Read { max: usize, mode: ReadMode },
    Write { len: usize },
    /// Milliseconds; negative waits forever
    Poll { timeout_ms: i32, writable: bool },
    Shutdown(How),
    Close,
    SetBlocking(bool),
    SetNoDelay(bool),
    SetDebug(bool),
    Status(Detail),
    Endpoints,
    Resolve(String),
}

impl Op {
    /// Progress text shown while the operation runs
    pub fn progress(&self) -> String {
        match self {
            Op::Socket => "creating socket".to_string(),
            Op::Connect(addr) => format!("connecting to {}", addr),
            Op::Accept => "accepting".to_string(),
            Op::Read {
                max,
                mode: ReadMode::BestEffort,
            } => format!("reading {} buf", max),
            Op::Read {
                max,
                mode: ReadMode::Exact,
            } => format!("reading exactly {} bytes", max),
            Op::Write { len } => format!("writing {} bytes", len),
            Op::Poll { timeout_ms, .. } => format!("polling {} ms", timeout_ms),
            Op::Shutdown(How::Read) => "shutting down read side".to_string(),
            Op::Shutdown(How::Write) => "shutting down write side".to_string(),
            Op::Shutdown(How::Both) => "shutting down both sides".to_string(),
            Op::Close => "closing".to_string(),
            Op::SetBlocking(true) => "setting blocking".to_string(),
            Op::SetBlocking(false) => "setting non-blocking".to_string(),
            Op::SetNoDelay(true) => "setting no-delay".to_string(),
            Op::SetNoDelay(false) => "setting delay".to_string(),
            Op::SetDebug(on) => format!("setting SO_DEBUG {}", if *on { "on" } else { "off" }),
            Op::Status(_) => "querying status".to_string(),
            Op::Endpoints => "querying endpoints".to_string(),
            Op::Resolve(host) => format!("resolving {}", host),
        }
    }

    /// Short syscall-ish name used in error lines
    pub fn name(&self) -> &'static str {
        match self {
            Op::Socket => "socket",
            Op::Connect(_) => "connect",
            Op::Accept => "accept",
            Op::Read { .. } => "read",
            Op::Write { .. } => "write",
            Op::Poll { .. } => "poll",
            Op::Shutdown(_) => "shutdown",
            Op::Close => "close",
            Op::SetBlocking(_) => "fcntl",
            Op::SetNoDelay(_) | Op::SetDebug(_) => "setsockopt",
            Op::Status(_) => "getsockopt",
            Op::Endpoints => "getsockname",
            Op::Resolve(_) => "resolve",
        }
    }
}

/// Readiness bits observed by `poll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness(pub i16);

impl Readiness {
    const NAMES: [(i16, &'static str); 7] = [
        (POLLIN, "POLLIN"),
        (POLLPRI, "POLLPRI"),
        (POLLOUT, "POLLOUT"),
        (POLLRDHUP, "POLLRDHUP"),
        (POLLHUP, "POLLHUP"),
        (POLLERR, "POLLERR"),
        (POLLNVAL, "POLLNVAL"),
    ];

    pub fn readable(self) -> bool {
        self.0 & POLLIN != 0
    }
    pub fn urgent(self) -> bool {
        self.0 & POLLPRI != 0
    }
    pub fn writable(self) -> bool {
        self.0 & POLLOUT != 0
    }
    pub fn peer_closed(self) -> bool {
        POLLRDHUP != 0 && self.0 & POLLRDHUP != 0
    }
    pub fn hung_up(self) -> bool {
        self.0 & POLLHUP != 0
    }
    pub fn error(self) -> bool {
        self.0 & POLLERR != 0
    }
    pub fn invalid(self) -> bool {
        self.0 & POLLNVAL != 0
    }

    /// Names of the set bits, in a fixed order
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| *bit != 0 && self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

/// One reported counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub name: &'static str,
    pub value: String,
}

/// Local and remote endpoint, each looked up on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub local: Result<SocketAddrV4, Error>,
    pub peer: Result<SocketAddrV4, Error>,
}

/// Payload of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Nothing beyond "it worked"
    Done,
    Connected(SocketAddrV4),
    Accepted(SocketAddrV4),
    /// Bytes received; empty on EOF
    Received(Vec<u8>),
    Written(usize),
    Ready(Readiness),
    Status(Vec<Counter>),
    Endpoints(Endpoints),
    Resolved {
        host: String,
        elapsed: Duration,
        result: DnsResult,
    },
    NoResult {
        host: String,
        elapsed: Duration,
        reason: DnsError,
    },
}

/// Result of exactly one socket operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        op: Op,
        report: Report,
    },
    /// Fewer bytes moved than requested, without an error
    Partial {
        op: Op,
        transferred: usize,
        requested: usize,
    },
    Timeout {
        op: Op,
        waited: Duration,
    },
    Error {
        op: Op,
        /// Bytes moved before the failure, for transfers
        transferred: Option<usize>,
        error: Error,
    },
}

impl Outcome {
    pub fn success(op: Op, report: Report) -> Self {
        Outcome::Success { op, report }
    }

    pub fn error(op: Op, error: Error) -> Self {
        Outcome::Error {
            op,
            transferred: None,
            error,
        }
    }

    /// Map a plain `Result<(), Error>` to `Done` or `Error`
    pub fn from_result(op: Op, result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Outcome::success(op, Report::Done),
            Err(error) => Outcome::error(op, error),
        }
    }

    pub fn op(&self) -> &Op {
        match self {
            Outcome::Success { op, .. }
            | Outcome::Partial { op, .. }
            | Outcome::Timeout { op, .. }
            | Outcome::Error { op, .. } => op,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            Outcome::Success { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn os_error(&self) -> Option<libsock::Errno> {
        match self {
            Outcome::Error { error, .. } => error.errno(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_names_follow_bit_order() {
        let ready = Readiness(POLLOUT | POLLIN | POLLHUP);
        assert_eq!(ready.names(), vec!["POLLIN", "POLLOUT", "POLLHUP"]);
        assert!(ready.readable() && ready.writable() && ready.hung_up());
        assert!(!ready.error() && !ready.invalid() && !ready.urgent());
    }

    #[test]
    fn outcome_exposes_its_operation() {
        let outcome = Outcome::from_result(Op::Close, Err(Error::Os(libsock::Errno::EBADF)));
        assert!(outcome.is_error());
        assert_eq!(outcome.op(), &Op::Close);
        assert_eq!(outcome.os_error(), Some(libsock::Errno::EBADF));
    }

    #[test]
    fn progress_text_carries_parameters() {
        assert_eq!(Op::Write { len: 5 }.progress(), "writing 5 bytes");
        assert_eq!(
            Op::Read {
                max: 1024,
                mode: ReadMode::BestEffort
            }
            .progress(),
            "reading 1024 buf"
        );
        assert_eq!(
            Op::Poll {
                timeout_ms: 1000,
                writable: false
            }
            .progress(),
            "polling 1000 ms"
        );
    }
}
