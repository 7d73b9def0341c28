//! Session state machine
//!
//! Owns the [`SocketHandle`] (and, in server mode, the listening socket) and
//! sequences its lifecycle: initial connect or listen+accept, shutdown,
//! close and reconnect/re-accept. Failures during one-time setup are
//! [`Fatal`]; everything after that is an [`Outcome`].

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::thread;
use std::time::Duration;

use libsock::dns::{self, DnsError};
use libsock::socket::{self, SockAddrIn};
use libsock::{Errno, Error, OwnedFd};
use tracing::{debug, info, warn};

use crate::config::{Config, Mode};
use crate::handle::{LifecycleState, Role, SocketHandle};
use crate::outcome::{How, Op, Outcome, Report};
use crate::signal::Interrupt;
use crate::transport;

/// Pause before retrying an accept that failed for a non-transient reason
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Failures that end the whole session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    /// A one-time setup syscall failed
    Setup { step: &'static str, error: Error },
    /// The client target could not be parsed or resolved
    Resolve { host: String, reason: DnsError },
    /// SIGINT while blocked in accept
    Interrupted,
}

impl Fatal {
    fn setup(step: &'static str) -> impl FnOnce(Error) -> Fatal {
        move |error| Fatal::Setup { step, error }
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fatal::Setup { step, error } => write!(f, "{} error: {}", step, error),
            Fatal::Resolve { host, reason } => write!(f, "cannot resolve {}: {}", host, reason),
            Fatal::Interrupted => write!(f, "interrupted while accepting"),
        }
    }
}

impl std::error::Error for Fatal {}

/// Turn the client host argument into an address, numeric first
pub fn parse_target(host: &str, port: u16) -> Result<SocketAddrV4, Fatal> {
    let ip = match host.parse::<Ipv4Addr>() {
        Ok(ip) => ip,
        Err(_) => dns::resolve_ipv4(host).map_err(|reason| Fatal::Resolve {
            host: host.to_string(),
            reason,
        })?,
    };
    Ok(SocketAddrV4::new(ip, port))
}

pub struct Session {
    handle: SocketHandle,
    /// Server mode only
    listener: Option<OwnedFd>,
    /// Client mode only
    target: Option<SocketAddrV4>,
    interrupt: Interrupt,
}

impl Session {
    /// Set up whichever side `config` asks for, stopping short of the first
    /// blocking call: a client holds an unconnected socket, a server is
    /// listening.
    pub fn new(config: &Config, interrupt: Interrupt) -> Result<Session, Fatal> {
        match &config.mode {
            Mode::Client { host } => {
                let target = parse_target(host, config.port)?;
                Session::client(target, interrupt)
            }
            Mode::Server => Session::listen(config.port, config.backlog, interrupt),
        }
    }

    /// `UNINITIALIZED` client holding a fresh socket aimed at `target`
    pub fn client(target: SocketAddrV4, interrupt: Interrupt) -> Result<Session, Fatal> {
        let fd = socket::tcp_socket().map_err(Fatal::setup("socket"))?;
        let mut handle = SocketHandle::new(Role::Client);
        handle.replace(fd, Role::Client, LifecycleState::Uninitialized);
        Ok(Session {
            handle,
            listener: None,
            target: Some(target),
            interrupt,
        })
    }

    /// `LISTENING` server bound to `port` on all interfaces
    pub fn listen(port: u16, backlog: i32, interrupt: Interrupt) -> Result<Session, Fatal> {
        let listener = socket::tcp_socket().map_err(Fatal::setup("socket"))?;
        if let Err(error) = socket::set_reuse_addr(listener.fd(), true) {
            warn!(%error, "SO_REUSEADDR not set");
        }
        socket::bind_inet(listener.fd(), &SockAddrIn::new([0, 0, 0, 0], port))
            .map_err(Fatal::setup("bind"))?;
        socket::listen(listener.fd(), backlog).map_err(Fatal::setup("listen"))?;

        let mut handle = SocketHandle::new(Role::Server);
        handle.transition(LifecycleState::Listening);
        info!(port, backlog, "listening");
        Ok(Session {
            handle,
            listener: Some(listener),
            target: None,
            interrupt,
        })
    }

    pub fn handle(&self) -> &SocketHandle {
        &self.handle
    }

    pub fn role(&self) -> Role {
        self.handle.role()
    }

    pub fn state(&self) -> LifecycleState {
        self.handle.state()
    }

    /// Where a client connects to
    pub fn target(&self) -> Option<SocketAddrV4> {
        self.target
    }

    /// Address the server's listening socket is bound to
    pub fn listen_addr(&self) -> Option<SocketAddrV4> {
        let listener = self.listener.as_ref()?;
        socket::local_addr(listener.fd()).ok().map(SocketAddrV4::from)
    }

    /// The operation the first blocking step will perform, for progress output
    pub fn startup_op(&self) -> Op {
        match self.target {
            Some(target) => Op::Connect(target),
            None => Op::Accept,
        }
    }

    /// Perform the first blocking step: connect (client) or accept (server).
    /// A failed connect is an outcome, not fatal; the operator may `rc`.
    pub fn start(&mut self) -> Result<Outcome, Fatal> {
        match self.role() {
            Role::Client => Ok(self.connect()),
            Role::Server => self.accept(),
        }
    }

    /// Connect the current descriptor to the target (client mode)
    pub fn connect(&mut self) -> Outcome {
        let target = match self.target {
            Some(target) => target,
            None => {
                let nowhere = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
                return Outcome::error(Op::Connect(nowhere), Error::Os(Errno::EINVAL));
            }
        };
        let fd = match self.handle.current_descriptor() {
            Ok(fd) => fd,
            Err(error) => return Outcome::error(Op::Connect(target), error),
        };
        let outcome = transport::connect(fd, target);
        if outcome.is_success() {
            self.handle.transition(LifecycleState::Established);
            self.handle.set_peer(target);
        }
        outcome
    }

    /// Block until a client connects, then install it as the session socket.
    ///
    /// Errors other than an operator interrupt are retried.
    pub fn accept(&mut self) -> Result<Outcome, Fatal> {
        let listener = match &self.listener {
            Some(listener) => listener.fd(),
            None => return Ok(Outcome::error(Op::Accept, Error::Os(Errno::EINVAL))),
        };
        loop {
            if self.interrupt.raised() {
                return Err(Fatal::Interrupted);
            }
            match transport::accept(listener) {
                Ok((fd, peer)) => {
                    info!(%peer, "accepted");
                    self.handle.replace(fd, Role::Server, LifecycleState::Established);
                    self.handle.set_peer(peer);
                    return Ok(Outcome::success(Op::Accept, Report::Accepted(peer)));
                }
                Err(error) if self.interrupt.caused(&error) => return Err(Fatal::Interrupted),
                Err(error) => {
                    warn!(%error, "accept error");
                    let transient = error.is(Errno::EINTR)
                        || error.errno().map_or(false, Errno::is_transient_accept);
                    if !transient {
                        thread::sleep(ACCEPT_RETRY_DELAY);
                    }
                }
            }
        }
    }

    /// `rc`: connect again (client) or accept a new connection (server)
    pub fn reconnect(&mut self) -> Result<Outcome, Fatal> {
        match self.role() {
            Role::Client => {
                if !self.handle.has_descriptor() {
                    match socket::tcp_socket() {
                        Ok(fd) => {
                            debug!("re-arming client with a fresh descriptor");
                            self.handle
                                .replace(fd, Role::Client, LifecycleState::Uninitialized);
                        }
                        Err(error) => return Ok(Outcome::error(Op::Socket, error)),
                    }
                }
                Ok(self.connect())
            }
            Role::Server => self.accept(),
        }
    }

    /// Shut down one or both directions; the state follows only on success
    pub fn shutdown(&mut self, how: How) -> Outcome {
        let outcome = transport::shutdown(&self.handle, how);
        if outcome.is_success() {
            let next = self.handle.state().after_shutdown(how);
            self.handle.transition(next);
        }
        outcome
    }

    /// Release the descriptor; a second close reports `EBADF`
    pub fn close(&mut self) -> Outcome {
        Outcome::from_result(Op::Close, self.handle.release())
    }
}
