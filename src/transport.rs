//! One syscall per operation, normalized into an [`Outcome`]
//!
//! Nothing here retries or changes lifecycle state; the session decides what
//! a result means for the connection.

use std::net::SocketAddrV4;
use std::time::Instant;

use libsock::io::poll_events::*;
use libsock::io::{self, PollFd};
use libsock::socket::{self, SockAddrIn};
use libsock::tcp_info::{self, TcpInfo};
use libsock::{dns, Errno, Error, Fd, OwnedFd};
use tracing::{debug, trace};

use crate::handle::SocketHandle;
use crate::outcome::{Counter, Detail, Endpoints, How, Op, Outcome, ReadMode, Readiness, Report};

/// Connect `fd` to `addr`; blocks until the handshake finishes or fails
pub fn connect(fd: Fd, addr: SocketAddrV4) -> Outcome {
    let op = Op::Connect(addr);
    match socket::connect_inet(fd, &SockAddrIn::from(addr)) {
        Ok(()) => Outcome::success(op, Report::Connected(addr)),
        Err(error) => Outcome::error(op, error),
    }
}

/// One blocking `accept` attempt
pub fn accept(listener: Fd) -> Result<(OwnedFd, SocketAddrV4), Error> {
    let (fd, peer) = socket::accept(listener)?;
    Ok((fd, peer.into()))
}

/// Receive up to (`BestEffort`) or exactly (`Exact`) `max` bytes
pub fn read(handle: &SocketHandle, max: usize, mode: ReadMode) -> Outcome {
    let op = Op::Read { max, mode };
    let fd = match handle.current_descriptor() {
        Ok(fd) => fd,
        Err(error) => return Outcome::error(op, error),
    };

    let mut buf = Vec::new();
    if buf.try_reserve_exact(max).is_err() {
        return Outcome::error(op, Error::Os(Errno::ENOMEM));
    }
    buf.resize(max, 0);
    match mode {
        ReadMode::BestEffort => match socket::recv(fd, &mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Outcome::success(op, Report::Received(buf))
            }
            Err(error) => Outcome::Error {
                op,
                transferred: Some(0),
                error,
            },
        },
        ReadMode::Exact => {
            let mut got = 0;
            while got < max {
                match socket::recv(fd, &mut buf[got..]) {
                    Ok(0) => {
                        return Outcome::Error {
                            op,
                            transferred: Some(got),
                            error: Error::Eof,
                        }
                    }
                    Ok(n) => {
                        got += n;
                        trace!(got, max, "exact read progress");
                    }
                    Err(error) => {
                        return Outcome::Error {
                            op,
                            transferred: Some(got),
                            error,
                        }
                    }
                }
            }
            Outcome::success(op, Report::Received(buf))
        }
    }
}

/// Send `payload` with a single `send`; a short count is `Partial`
pub fn write(handle: &SocketHandle, payload: &[u8]) -> Outcome {
    let op = Op::Write { len: payload.len() };
    let fd = match handle.current_descriptor() {
        Ok(fd) => fd,
        Err(error) => return Outcome::error(op, error),
    };
    match socket::send(fd, payload) {
        Ok(n) if n < payload.len() => Outcome::Partial {
            op,
            transferred: n,
            requested: payload.len(),
        },
        Ok(n) => Outcome::success(op, Report::Written(n)),
        Err(error) => Outcome::Error {
            op,
            transferred: Some(0),
            error,
        },
    }
}

/// Wait up to `timeout_ms` for readiness; negative waits forever
pub fn poll(handle: &SocketHandle, timeout_ms: i32, writable: bool) -> Outcome {
    let op = Op::Poll {
        timeout_ms,
        writable,
    };
    let fd = match handle.current_descriptor() {
        Ok(fd) => fd,
        Err(error) => return Outcome::error(op, error),
    };

    let mut events = POLLIN | POLLPRI | POLLRDHUP;
    if writable {
        events |= POLLOUT;
    }
    let mut fds = [PollFd::new(fd, events)];
    let started = Instant::now();
    match io::poll(&mut fds, timeout_ms) {
        Ok(0) => Outcome::Timeout {
            op,
            waited: started.elapsed(),
        },
        Ok(_) => Outcome::success(op, Report::Ready(Readiness(fds[0].revents))),
        Err(error) => Outcome::error(op, error),
    }
}

pub fn shutdown(handle: &SocketHandle, how: How) -> Outcome {
    let op = Op::Shutdown(how);
    let result = handle
        .current_descriptor()
        .and_then(|fd| socket::shutdown(fd, how.raw()));
    Outcome::from_result(op, result)
}

pub fn set_blocking(handle: &SocketHandle, blocking: bool) -> Outcome {
    let result = handle
        .current_descriptor()
        .and_then(|fd| io::set_nonblocking(fd, !blocking));
    Outcome::from_result(Op::SetBlocking(blocking), result)
}

/// `true` disables Nagle's algorithm
pub fn set_no_delay(handle: &SocketHandle, no_delay: bool) -> Outcome {
    let result = handle
        .current_descriptor()
        .and_then(|fd| socket::set_nodelay(fd, no_delay));
    Outcome::from_result(Op::SetNoDelay(no_delay), result)
}

pub fn set_debug(handle: &SocketHandle, on: bool) -> Outcome {
    let result = handle
        .current_descriptor()
        .and_then(|fd| socket::set_debug(fd, on));
    Outcome::from_result(Op::SetDebug(on), result)
}

/// Collects counters, skipping the ones the platform refuses
struct Counters {
    list: Vec<Counter>,
    first_error: Option<Error>,
}

impl Counters {
    fn new() -> Self {
        Counters {
            list: Vec::new(),
            first_error: None,
        }
    }

    fn push(&mut self, name: &'static str, value: impl ToString) {
        self.list.push(Counter {
            name,
            value: value.to_string(),
        });
    }

    fn try_push<T: ToString>(&mut self, name: &'static str, value: Result<T, Error>) {
        match value {
            Ok(v) => self.push(name, v),
            Err(error) => {
                debug!(counter = name, %error, "counter unavailable");
                self.first_error.get_or_insert(error);
            }
        }
    }
}

fn push_tcp_info(counters: &mut Counters, info: &TcpInfo, detail: Detail) {
    counters.push("tcp_state", info.state_name());
    if detail == Detail::Full {
        for (name, value) in info.counters() {
            counters.push(name, value);
        }
    }
}

/// Socket- and TCP-level counters for the current descriptor
pub fn introspect(handle: &SocketHandle, detail: Detail) -> Outcome {
    let op = Op::Status(detail);
    let fd = match handle.current_descriptor() {
        Ok(fd) => fd,
        Err(error) => return Outcome::error(op, error),
    };

    let mut counters = Counters::new();
    counters.push("lifecycle", handle.state());
    counters.try_push(
        "mode",
        io::is_nonblocking(fd).map(|nb| if nb { "non-blocking" } else { "blocking" }),
    );
    counters.try_push("TCP_NODELAY", socket::nodelay(fd));
    counters.try_push("SO_RCVBUF", socket::recv_buffer_size(fd));
    counters.try_push("SO_SNDBUF", socket::send_buffer_size(fd));
    counters.try_push("FIONREAD", io::bytes_readable(fd));
    counters.try_push("SIOCOUTQ", io::bytes_unsent(fd));
    counters.try_push(
        "SO_ERROR",
        socket::take_error(fd).map(|code| match code {
            0 => "none".to_string(),
            code => Errno::from_raw(code).to_string(),
        }),
    );
    match tcp_info::tcp_info(fd) {
        Ok(info) => push_tcp_info(&mut counters, &info, detail),
        Err(error) => {
            debug!(%error, "TCP_INFO unavailable");
        }
    }

    // Only the lifecycle line means every OS query failed.
    if counters.list.len() == 1 {
        if let Some(error) = counters.first_error {
            return Outcome::error(op, error);
        }
    }
    Outcome::success(op, Report::Status(counters.list))
}

/// Local and remote address; one failing does not hide the other
pub fn show_endpoints(handle: &SocketHandle) -> Outcome {
    let op = Op::Endpoints;
    let fd = match handle.current_descriptor() {
        Ok(fd) => fd,
        Err(error) => return Outcome::error(op, error),
    };
    let endpoints = Endpoints {
        local: socket::local_addr(fd).map(SocketAddrV4::from),
        peer: socket::peer_addr(fd).map(SocketAddrV4::from),
    };
    Outcome::success(op, Report::Endpoints(endpoints))
}

/// Look up `host` without touching the session socket
pub fn resolve(host: &str) -> Outcome {
    let op = Op::Resolve(host.to_string());
    let started = Instant::now();
    let result = dns::resolve(host);
    let elapsed = started.elapsed();
    let report = match result {
        Ok(result) => Report::Resolved {
            host: host.to_string(),
            elapsed,
            result,
        },
        Err(reason) => Report::NoResult {
            host: host.to_string(),
            elapsed,
            reason,
        },
    };
    Outcome::success(op, report)
}
