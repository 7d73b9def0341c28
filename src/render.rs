//! Console text for replies and outcomes
//!
//! The front end prints `"{progress} ... "` before an operation and the
//! rendered outcome right after it, so single-line results finish the
//! progress line. Multi-line results start on a fresh line.

use std::fmt::Write as _;
use std::time::Duration;

use libsock::Error;

use crate::command;
use crate::dispatcher::Reply;
use crate::outcome::{Endpoints, Op, Outcome, Report};

fn millis(d: Duration) -> String {
    format!("{:.1} ms", d.as_secs_f64() * 1000.0)
}

fn past_tense(op: &Op) -> &'static str {
    match op {
        Op::Read { .. } => "read",
        Op::Write { .. } => "wrote",
        _ => "moved",
    }
}

fn endpoint(side: &Result<std::net::SocketAddrV4, Error>) -> String {
    match side {
        Ok(addr) => addr.to_string(),
        Err(error) => format!("? ({})", error),
    }
}

fn report(out: &mut String, report: &Report) {
    // Writing into a String cannot fail.
    let _ = match report {
        Report::Done => write!(out, "ok"),
        Report::Connected(addr) => write!(out, "connected to {}", addr),
        Report::Accepted(peer) => write!(out, "accepted {}", peer),
        Report::Received(data) if data.is_empty() => write!(out, "read 0 bytes"),
        Report::Received(data) => write!(
            out,
            "read {} bytes \"{}\"",
            data.len(),
            data.escape_ascii()
        ),
        Report::Written(n) => write!(out, "wrote {} bytes", n),
        Report::Ready(ready) => {
            let names = ready.names();
            if names.is_empty() {
                write!(out, "ready")
            } else {
                write!(out, "ready: {}", names.join(" "))
            }
        }
        Report::Status(counters) => {
            let _ = write!(out, "status");
            for counter in counters {
                let _ = write!(out, "\n  {:<18} {}", counter.name, counter.value);
            }
            Ok(())
        }
        Report::Endpoints(Endpoints { local, peer }) => write!(
            out,
            "local {}, peer {}",
            endpoint(local),
            endpoint(peer)
        ),
        Report::Resolved {
            host,
            elapsed,
            result,
        } => {
            let _ = write!(out, "{} resolved in {}", host, millis(*elapsed));
            if let Some(name) = &result.canonical_name {
                let _ = write!(out, "\n  canonical name: {}", name);
            }
            for alias in &result.aliases {
                let _ = write!(out, "\n  alias: {}", alias);
            }
            for addr in &result.addrs {
                let _ = write!(out, "\n  address: {}", addr);
            }
            Ok(())
        }
        Report::NoResult {
            host,
            elapsed,
            reason,
        } => write!(
            out,
            "{}: no result ({}) after {}",
            host,
            reason,
            millis(*elapsed)
        ),
    };
}

/// One outcome, as printed after its progress line
pub fn outcome(outcome: &Outcome) -> String {
    let mut out = String::new();
    let _ = match outcome {
        Outcome::Success { report: r, .. } => {
            report(&mut out, r);
            Ok(())
        }
        Outcome::Partial {
            op,
            transferred,
            requested,
        } => write!(
            out,
            "{} {} of {} bytes",
            past_tense(op),
            transferred,
            requested
        ),
        Outcome::Timeout { waited, .. } => write!(out, "time out after {}", millis(*waited)),
        Outcome::Error {
            op,
            transferred: Some(n),
            error,
        } => write!(out, "{} {} bytes, {}", past_tense(op), n, error),
        Outcome::Error {
            op,
            transferred: None,
            error,
        } => write!(out, "{} error: {}", op.name(), error),
    };
    out
}

/// Text for a whole reply; empty when there is nothing to say
pub fn reply(reply: &Reply) -> String {
    match reply {
        Reply::Outcome(o) => outcome(o),
        Reply::Help => command::help().trim_end().to_string(),
        Reply::Quit | Reply::Idle => String::new(),
        Reply::Unrecognized(token) => {
            format!("unknown command '{}', type ? for help", token)
        }
        Reply::Usage(usage) => usage.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Counter, ReadMode, Readiness};
    use libsock::io::poll_events::{POLLIN, POLLOUT};
    use libsock::Errno;

    fn read_op() -> Op {
        Op::Read {
            max: 1024,
            mode: ReadMode::BestEffort,
        }
    }

    #[test]
    fn transfers() {
        assert_eq!(
            outcome(&Outcome::success(read_op(), Report::Received(b"HHH".to_vec()))),
            "read 3 bytes \"HHH\""
        );
        assert_eq!(
            outcome(&Outcome::success(read_op(), Report::Received(Vec::new()))),
            "read 0 bytes"
        );
        assert_eq!(
            outcome(&Outcome::success(Op::Write { len: 5 }, Report::Written(5))),
            "wrote 5 bytes"
        );
        assert_eq!(
            outcome(&Outcome::Partial {
                op: Op::Write { len: 5 },
                transferred: 2,
                requested: 5
            }),
            "wrote 2 of 5 bytes"
        );
    }

    #[test]
    fn errors_carry_code_and_count() {
        let text = outcome(&Outcome::Error {
            op: Op::Write { len: 1 },
            transferred: Some(0),
            error: Error::Os(Errno::EPIPE),
        });
        assert!(text.starts_with("wrote 0 bytes, 32 - "), "{}", text);

        let text = outcome(&Outcome::error(Op::Close, Error::Os(Errno::EBADF)));
        assert!(text.starts_with("close error: 9 - "), "{}", text);
    }

    #[test]
    fn poll_results() {
        let timeout = Outcome::Timeout {
            op: Op::Poll {
                timeout_ms: 0,
                writable: false,
            },
            waited: Duration::from_millis(0),
        };
        assert!(outcome(&timeout).starts_with("time out"));
        let ready = Outcome::success(
            Op::Poll {
                timeout_ms: 0,
                writable: true,
            },
            Report::Ready(Readiness(POLLIN | POLLOUT)),
        );
        assert_eq!(outcome(&ready), "ready: POLLIN POLLOUT");
    }

    #[test]
    fn status_lists_one_counter_per_line() {
        let text = outcome(&Outcome::success(
            Op::Status(crate::outcome::Detail::Basic),
            Report::Status(vec![
                Counter {
                    name: "lifecycle",
                    value: "ESTABLISHED".into(),
                },
                Counter {
                    name: "SO_RCVBUF",
                    value: "131072".into(),
                },
            ]),
        ));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("lifecycle") && lines[1].contains("ESTABLISHED"));
    }

    #[test]
    fn replies() {
        assert_eq!(reply(&Reply::Idle), "");
        assert_eq!(
            reply(&Reply::Unrecognized("zz".into())),
            "unknown command 'zz', type ? for help"
        );
        assert!(reply(&Reply::Help).contains("re-connect/re-accept"));
    }
}
