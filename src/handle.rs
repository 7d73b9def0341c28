//! The one socket descriptor a session owns
//!
//! The descriptor and the lifecycle state only change together, inside the
//! `&mut self` methods below, so nothing can observe one without the other.

use std::fmt;
use std::net::SocketAddrV4;

use libsock::{Errno, Error, Fd, OwnedFd};
use tracing::debug;

/// Which end of the connection the handle plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Where the connection is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    /// Server only, between bind/listen and the first accept
    Listening,
    Established,
    HalfClosedRead,
    HalfClosedWrite,
    Closed,
}

impl LifecycleState {
    /// State after a successful `shutdown(how)`
    pub fn after_shutdown(self, how: crate::outcome::How) -> LifecycleState {
        use crate::outcome::How;
        use LifecycleState::*;
        match (self, how) {
            (_, How::Both) => Closed,
            (Established, How::Read) => HalfClosedRead,
            (Established, How::Write) => HalfClosedWrite,
            (HalfClosedRead, How::Write) | (HalfClosedWrite, How::Read) => Closed,
            (state, _) => state,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "UNINITIALIZED",
            LifecycleState::Listening => "LISTENING",
            LifecycleState::Established => "ESTABLISHED",
            LifecycleState::HalfClosedRead => "HALF_CLOSED_READ",
            LifecycleState::HalfClosedWrite => "HALF_CLOSED_WRITE",
            LifecycleState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Owns at most one live socket descriptor
#[derive(Debug)]
pub struct SocketHandle {
    fd: Option<OwnedFd>,
    role: Role,
    state: LifecycleState,
    peer: Option<SocketAddrV4>,
}

impl SocketHandle {
    pub fn new(role: Role) -> Self {
        SocketHandle {
            fd: None,
            role,
            state: LifecycleState::Uninitialized,
            peer: None,
        }
    }

    /// The live descriptor, or `EBADF` once released
    pub fn current_descriptor(&self) -> Result<Fd, Error> {
        self.fd
            .as_ref()
            .map(OwnedFd::fd)
            .ok_or(Error::Os(Errno::EBADF))
    }

    pub fn has_descriptor(&self) -> bool {
        self.fd.is_some()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Peer recorded by the last successful connect/accept
    pub fn peer(&self) -> Option<SocketAddrV4> {
        self.peer
    }

    /// Install `fd`, closing whatever descriptor was held before.
    ///
    /// A failure to close the old descriptor is logged, not returned: the
    /// descriptor number is gone either way and the new one is installed.
    pub fn replace(&mut self, fd: OwnedFd, role: Role, state: LifecycleState) {
        if let Some(old) = self.fd.take() {
            let raw = old.fd();
            match old.close() {
                Ok(()) => debug!(fd = raw.raw(), "closed replaced descriptor"),
                Err(e) => debug!(
                    fd = raw.raw(),
                    error = %e,
                    "replaced descriptor was already unusable"
                ),
            }
        }
        debug!(fd = fd.fd().raw(), from = %self.state, to = %state, "descriptor installed");
        self.fd = Some(fd);
        self.role = role;
        self.state = state;
        self.peer = None;
    }

    /// Close the descriptor. Releasing twice reports `EBADF`.
    pub fn release(&mut self) -> Result<(), Error> {
        let fd = self.fd.take().ok_or(Error::Os(Errno::EBADF))?;
        debug!(fd = fd.fd().raw(), from = %self.state, "descriptor released");
        self.state = LifecycleState::Closed;
        self.peer = None;
        fd.close()
    }

    /// Record a transition that keeps the current descriptor
    pub fn transition(&mut self, to: LifecycleState) {
        if self.state != to {
            debug!(from = %self.state, to = %to, "lifecycle transition");
            self.state = to;
        }
    }

    pub fn set_peer(&mut self, peer: SocketAddrV4) {
        self.peer = Some(peer);
    }
}
