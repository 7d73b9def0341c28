//! Command vocabulary and argument validation

use std::fmt;

/// Every command the dispatcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Help,
    Quit,
    Close,
    Reconnect,
    Read,
    ReadExact,
    Write,
    Poll,
    PollWritable,
    Endpoints,
    Status,
    StatusFull,
    ShutdownRead,
    ShutdownWrite,
    ShutdownBoth,
    Blocking,
    NonBlocking,
    Delay,
    NoDelay,
    Debug,
    NoDebug,
    Resolve,
}

/// (token, verb, argument synopsis, description), in help order
const TABLE: &[(&str, Verb, &str, &str)] = &[
    ("?", Verb::Help, "", "help"),
    ("q", Verb::Quit, "", "quit"),
    ("c", Verb::Close, "", "close"),
    ("rc", Verb::Reconnect, "", "re-connect/re-accept"),
    ("r", Verb::Read, "[N]", "read up to N bytes (default 1024)"),
    ("rn", Verb::ReadExact, "[N]", "read exactly N bytes (default 1024)"),
    ("w", Verb::Write, "[N|str]", "write N bytes (default 1) or string str"),
    ("p", Verb::Poll, "[secs]", "poll readable (default 0 s)"),
    ("pw", Verb::PollWritable, "[secs]", "poll readable or writable"),
    ("n", Verb::Endpoints, "", "show local and remote endpoint"),
    ("st", Verb::Status, "", "status"),
    ("sta", Verb::StatusFull, "", "status, all TCP counters"),
    ("str", Verb::ShutdownRead, "", "shutdown read side"),
    ("stw", Verb::ShutdownWrite, "", "shutdown write side"),
    ("strw", Verb::ShutdownBoth, "", "shutdown both sides"),
    ("b", Verb::Blocking, "", "set blocking"),
    ("nb", Verb::NonBlocking, "", "set non-blocking"),
    ("d", Verb::Delay, "", "set delay (Nagle on)"),
    ("nd", Verb::NoDelay, "", "set no-delay (Nagle off)"),
    ("dbg", Verb::Debug, "", "set SO_DEBUG"),
    ("ndbg", Verb::NoDebug, "", "clear SO_DEBUG"),
    ("res", Verb::Resolve, "[host]", "resolve a domain name (default localhost)"),
];

impl Verb {
    pub fn from_token(token: &str) -> Option<Verb> {
        TABLE
            .iter()
            .find(|(t, _, _, _)| *t == token)
            .map(|(_, verb, _, _)| *verb)
    }

    pub fn token(self) -> &'static str {
        match self {
            Verb::Help => "?",
            Verb::Quit => "q",
            Verb::Close => "c",
            Verb::Reconnect => "rc",
            Verb::Read => "r",
            Verb::ReadExact => "rn",
            Verb::Write => "w",
            Verb::Poll => "p",
            Verb::PollWritable => "pw",
            Verb::Endpoints => "n",
            Verb::Status => "st",
            Verb::StatusFull => "sta",
            Verb::ShutdownRead => "str",
            Verb::ShutdownWrite => "stw",
            Verb::ShutdownBoth => "strw",
            Verb::Blocking => "b",
            Verb::NonBlocking => "nb",
            Verb::Delay => "d",
            Verb::NoDelay => "nd",
            Verb::Debug => "dbg",
            Verb::NoDebug => "ndbg",
            Verb::Resolve => "res",
        }
    }

    /// `token [args]` as shown in help and usage errors
    pub fn synopsis(self) -> String {
        let token = self.token();
        let args = TABLE
            .iter()
            .find(|(_, verb, _, _)| *verb == self)
            .map_or("", |(_, _, args, _)| *args);
        if args.is_empty() {
            token.to_string()
        } else {
            format!("{} {}", token, args)
        }
    }
}

/// Help listing, one command per line
pub fn help() -> String {
    let mut out = String::new();
    for (_, verb, _, description) in TABLE {
        out.push_str(&format!(" {:<12}- {}\n", verb.synopsis(), description));
    }
    out.push_str(" (empty)     - repeat last command\n");
    out
}

/// A recognized command and its raw arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub args: Vec<String>,
}

/// What a tokenized input line turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Empty,
    Command(Command),
    Unrecognized(String),
}

impl Command {
    pub fn new(verb: Verb, args: &[&str]) -> Command {
        Command {
            verb,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Classify a token list (first token is the command)
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Parsed {
        let Some((first, rest)) = tokens.split_first() else {
            return Parsed::Empty;
        };
        match Verb::from_token(first.as_ref()) {
            Some(verb) => Parsed::Command(Command {
                verb,
                args: rest.iter().map(|a| a.as_ref().to_string()).collect(),
            }),
            None => Parsed::Unrecognized(first.as_ref().to_string()),
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb.token())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Split an input line on whitespace
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// An argument the command cannot use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub verb: Verb,
    pub arg: String,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bad argument '{}', usage: {}",
            self.arg,
            self.verb.synopsis()
        )
    }
}

impl std::error::Error for UsageError {}

/// Byte count argument, `default` when absent
pub fn count_arg(command: &Command, default: usize) -> Result<usize, UsageError> {
    match command.arg(0) {
        None => Ok(default),
        Some(arg) => arg.parse().map_err(|_| UsageError {
            verb: command.verb,
            arg: arg.to_string(),
        }),
    }
}

/// Poll timeout in whole seconds, as milliseconds; negative waits forever
pub fn timeout_arg(command: &Command) -> Result<i32, UsageError> {
    let Some(arg) = command.arg(0) else {
        return Ok(0);
    };
    let secs: i64 = arg.parse().map_err(|_| UsageError {
        verb: command.verb,
        arg: arg.to_string(),
    })?;
    if secs < 0 {
        return Ok(-1);
    }
    Ok(secs.saturating_mul(1000).min(i32::MAX as i64) as i32)
}

/// Payload for `w`: N copies of `fill` for an all-digit argument, the
/// argument's own bytes otherwise, one `fill` byte when absent
pub fn write_payload(command: &Command, fill: u8) -> Result<Vec<u8>, UsageError> {
    let Some(arg) = command.arg(0) else {
        return Ok(vec![fill]);
    };
    if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
        let unusable = || UsageError {
            verb: command.verb,
            arg: arg.to_string(),
        };
        let len: usize = arg.parse().map_err(|_| unusable())?;
        let mut payload = Vec::new();
        payload.try_reserve_exact(len).map_err(|_| unusable())?;
        payload.resize(len, fill);
        return Ok(payload);
    }
    Ok(arg.as_bytes().to_vec())
}
