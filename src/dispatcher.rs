//! Maps operator commands onto session and transport operations
//!
//! The dispatcher does no terminal I/O. It announces each operation to a
//! [`Progress`] sink before running it and hands back a [`Reply`] for the
//! caller to render.

use tracing::debug;

use crate::command::{self, Command, Parsed, UsageError, Verb};
use crate::config::Config;
use crate::outcome::{Detail, How, Op, Outcome, ReadMode};
use crate::session::{Fatal, Session};
use crate::transport;

/// Host looked up by a bare `res`
pub const DEFAULT_RESOLVE_HOST: &str = "localhost";

/// Receives each operation just before it runs
pub trait Progress {
    fn begin(&mut self, op: &Op);
}

impl<F: FnMut(&Op)> Progress for F {
    fn begin(&mut self, op: &Op) {
        self(op)
    }
}

/// Progress sink that discards everything
pub struct Quiet;

impl Progress for Quiet {
    fn begin(&mut self, _op: &Op) {}
}

/// What one input line produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Outcome(Outcome),
    Help,
    Quit,
    /// First token was not a command
    Unrecognized(String),
    /// Command known, argument unusable; nothing ran
    Usage(UsageError),
    /// Empty line and nothing to repeat
    Idle,
}

pub struct Dispatcher {
    session: Session,
    read_len: usize,
    fill: u8,
    /// Last command that parsed with usable arguments
    last: Option<Command>,
}

impl Dispatcher {
    pub fn new(session: Session, config: &Config) -> Self {
        Dispatcher {
            session,
            read_len: config.read_len,
            fill: config.fill,
            last: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn last(&self) -> Option<&Command> {
        self.last.as_ref()
    }

    /// Run one tokenized input line. An empty line repeats the last command.
    ///
    /// Only an interrupt during a blocking accept is fatal.
    pub fn dispatch<S: AsRef<str>>(
        &mut self,
        tokens: &[S],
        progress: &mut dyn Progress,
    ) -> Result<Reply, Fatal> {
        let (command, fresh) = match Command::parse(tokens) {
            Parsed::Empty => match &self.last {
                Some(last) => (last.clone(), false),
                None => return Ok(Reply::Idle),
            },
            Parsed::Unrecognized(token) => {
                debug!(%token, "unrecognized command");
                return Ok(Reply::Unrecognized(token));
            }
            Parsed::Command(command) => (command, true),
        };

        debug!(%command, repeat = !fresh, "dispatch");
        let reply = self.execute(&command, progress)?;
        if fresh && !matches!(reply, Reply::Usage(_)) {
            self.last = Some(command);
        }
        Ok(reply)
    }

    /// Run one already-parsed command
    pub fn execute(
        &mut self,
        command: &Command,
        progress: &mut dyn Progress,
    ) -> Result<Reply, Fatal> {
        let outcome = match command.verb {
            Verb::Help => return Ok(Reply::Help),
            Verb::Quit => return Ok(Reply::Quit),
            Verb::Close => {
                progress.begin(&Op::Close);
                self.session.close()
            }
            Verb::Reconnect => {
                progress.begin(&self.session.startup_op());
                self.session.reconnect()?
            }
            Verb::Read | Verb::ReadExact => {
                let max = match command::count_arg(command, self.read_len) {
                    Ok(max) => max,
                    Err(usage) => return Ok(Reply::Usage(usage)),
                };
                let mode = if command.verb == Verb::Read {
                    ReadMode::BestEffort
                } else {
                    ReadMode::Exact
                };
                progress.begin(&Op::Read { max, mode });
                transport::read(self.session.handle(), max, mode)
            }
            Verb::Write => {
                let payload = match command::write_payload(command, self.fill) {
                    Ok(payload) => payload,
                    Err(usage) => return Ok(Reply::Usage(usage)),
                };
                progress.begin(&Op::Write { len: payload.len() });
                transport::write(self.session.handle(), &payload)
            }
            Verb::Poll | Verb::PollWritable => {
                let timeout_ms = match command::timeout_arg(command) {
                    Ok(ms) => ms,
                    Err(usage) => return Ok(Reply::Usage(usage)),
                };
                let writable = command.verb == Verb::PollWritable;
                progress.begin(&Op::Poll {
                    timeout_ms,
                    writable,
                });
                transport::poll(self.session.handle(), timeout_ms, writable)
            }
            Verb::Endpoints => {
                progress.begin(&Op::Endpoints);
                transport::show_endpoints(self.session.handle())
            }
            Verb::Status | Verb::StatusFull => {
                let detail = if command.verb == Verb::Status {
                    Detail::Basic
                } else {
                    Detail::Full
                };
                progress.begin(&Op::Status(detail));
                transport::introspect(self.session.handle(), detail)
            }
            Verb::ShutdownRead => self.shutdown(How::Read, progress),
            Verb::ShutdownWrite => self.shutdown(How::Write, progress),
            Verb::ShutdownBoth => self.shutdown(How::Both, progress),
            Verb::Blocking | Verb::NonBlocking => {
                let blocking = command.verb == Verb::Blocking;
                progress.begin(&Op::SetBlocking(blocking));
                transport::set_blocking(self.session.handle(), blocking)
            }
            Verb::Delay | Verb::NoDelay => {
                let no_delay = command.verb == Verb::NoDelay;
                progress.begin(&Op::SetNoDelay(no_delay));
                transport::set_no_delay(self.session.handle(), no_delay)
            }
            Verb::Debug | Verb::NoDebug => {
                let on = command.verb == Verb::Debug;
                progress.begin(&Op::SetDebug(on));
                transport::set_debug(self.session.handle(), on)
            }
            Verb::Resolve => {
                let host = command.arg(0).unwrap_or(DEFAULT_RESOLVE_HOST);
                progress.begin(&Op::Resolve(host.to_string()));
                transport::resolve(host)
            }
        };
        Ok(Reply::Outcome(outcome))
    }

    fn shutdown(&mut self, how: How, progress: &mut dyn Progress) -> Outcome {
        progress.begin(&Op::Shutdown(how));
        self.session.shutdown(how)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::LifecycleState;
    use crate::outcome::Report;
    use crate::signal::Interrupt;
    use libsock::Errno;
    use std::net::{Ipv4Addr, SocketAddrV4};

    /// (server, client) dispatchers over one loopback connection
    fn pair() -> (Dispatcher, Dispatcher) {
        let mut server = Session::listen(0, 1, Interrupt::detached()).unwrap();
        let port = server.listen_addr().unwrap().port();
        let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
        let mut client = Session::client(target, Interrupt::detached()).unwrap();
        assert!(client.start().unwrap().is_success());
        assert!(server.start().unwrap().is_success());
        (
            Dispatcher::new(server, &Config::server(port)),
            Dispatcher::new(client, &Config::client(Ipv4Addr::LOCALHOST, port)),
        )
    }

    fn run(dispatcher: &mut Dispatcher, line: &str) -> Reply {
        dispatcher
            .dispatch(&command::tokenize(line), &mut Quiet)
            .unwrap()
    }

    fn outcome(reply: Reply) -> Outcome {
        match reply {
            Reply::Outcome(outcome) => outcome,
            other => panic!("expected an outcome, got {:?}", other),
        }
    }

    #[test]
    fn empty_line_repeats_last_command() {
        let (mut server, mut client) = pair();
        assert_eq!(
            outcome(run(&mut client, "w 5")).report(),
            Some(&Report::Written(5))
        );
        assert_eq!(
            outcome(run(&mut client, "")).report(),
            Some(&Report::Written(5))
        );
        assert_eq!(
            outcome(run(&mut server, "rn 10")).report(),
            Some(&Report::Received(vec![b'H'; 10]))
        );
    }

    #[test]
    fn empty_line_without_history_is_idle() {
        let (_server, mut client) = pair();
        assert_eq!(run(&mut client, "   "), Reply::Idle);
    }

    #[test]
    fn unknown_and_malformed_input_do_not_touch_history() {
        let (_server, mut client) = pair();
        assert!(outcome(run(&mut client, "st")).is_success());
        assert_eq!(
            run(&mut client, "bogus 1 2"),
            Reply::Unrecognized("bogus".into())
        );
        assert!(matches!(run(&mut client, "r abc"), Reply::Usage(_)));
        assert_eq!(client.last().map(|c| c.verb), Some(Verb::Status));
    }

    #[test]
    fn help_and_quit_are_signals() {
        let (_server, mut client) = pair();
        assert_eq!(run(&mut client, "?"), Reply::Help);
        assert_eq!(run(&mut client, "q"), Reply::Quit);
    }

    #[test]
    fn progress_is_announced_before_the_result() {
        let (_server, mut client) = pair();
        let mut seen = Vec::new();
        let reply = client
            .dispatch(&["w", "hello"][..], &mut |op: &Op| seen.push(op.clone()))
            .unwrap();
        assert_eq!(seen, vec![Op::Write { len: 5 }]);
        assert_eq!(outcome(reply).op(), &Op::Write { len: 5 });
    }

    #[test]
    fn close_twice_reports_ebadf() {
        let (_server, mut client) = pair();
        assert!(outcome(run(&mut client, "c")).is_success());
        assert_eq!(
            outcome(run(&mut client, "c")).os_error(),
            Some(Errno::EBADF)
        );
        assert_eq!(
            outcome(run(&mut client, "w 1")).os_error(),
            Some(Errno::EBADF)
        );
    }

    #[test]
    fn shutdown_commands_drive_the_lifecycle() {
        let (_server, mut client) = pair();
        assert!(outcome(run(&mut client, "str")).is_success());
        assert_eq!(
            client.session().state(),
            LifecycleState::HalfClosedRead
        );
        assert!(outcome(run(&mut client, "stw")).is_success());
        assert_eq!(client.session().state(), LifecycleState::Closed);
    }

    #[test]
    fn socket_options_toggle() {
        let (_server, mut client) = pair();
        for line in ["nd", "d", "nb", "b"] {
            assert!(outcome(run(&mut client, line)).is_success(), "{}", line);
        }
    }

    #[test]
    fn resolve_failure_keeps_session_usable() {
        let (mut server, mut client) = pair();
        let reply = outcome(run(&mut client, "res nonexistent.invalid."));
        assert!(matches!(reply.report(), Some(Report::NoResult { .. })));
        assert!(outcome(run(&mut client, "w 2")).is_success());
        assert_eq!(
            outcome(run(&mut server, "rn 2")).report(),
            Some(&Report::Received(b"HH".to_vec()))
        );
    }
}
