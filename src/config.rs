//! Command-line configuration

use std::net::Ipv4Addr;

use clap::Parser;

/// Port used by both modes unless overridden
pub const DEFAULT_PORT: u16 = 2000;

/// Read size when `r`/`rn` are given no count
pub const DEFAULT_READ_LEN: usize = 1024;

/// Byte repeated by `w N`
pub const FILL_BYTE: u8 = b'H';

/// Pending-connection queue for the server's listening socket
pub const DEFAULT_BACKLOG: i32 = 5;

/// Interactive single-socket TCP controller.
///
/// With -s, listen on the port and accept one connection; otherwise connect
/// to HOST on the same port. Type `?` at the prompt for commands.
#[derive(Parser, Debug)]
#[command(name = "sockprobe", version)]
pub struct Cli {
    /// Run as server: bind, listen and accept one connection
    #[arg(short = 's', long = "server")]
    pub server: bool,

    /// IPv4 address (or host name) to connect to in client mode
    pub host: Option<String>,

    /// TCP port to listen on or connect to
    #[arg(short, long, env = "SOCKPROBE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Listen backlog in server mode
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    pub backlog: i32,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Which end of the connection this process plays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Connect to `host`
    Client { host: String },
    /// Accept on all interfaces
    Server,
}

/// Session settings derived from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub port: u16,
    pub backlog: i32,
    pub read_len: usize,
    pub fill: u8,
}

impl Config {
    /// Build the session settings, or `None` when neither `-s` nor a host was
    /// given and only the usage line should be printed.
    pub fn from_cli(cli: &Cli) -> Option<Config> {
        let mode = if cli.server {
            Mode::Server
        } else {
            Mode::Client {
                host: cli.host.clone()?,
            }
        };
        Some(Config {
            mode,
            port: cli.port,
            backlog: cli.backlog,
            read_len: DEFAULT_READ_LEN,
            fill: FILL_BYTE,
        })
    }

    /// Client-mode settings, mostly for tests and embedding
    pub fn client(addr: Ipv4Addr, port: u16) -> Config {
        Config {
            mode: Mode::Client {
                host: addr.to_string(),
            },
            port,
            backlog: DEFAULT_BACKLOG,
            read_len: DEFAULT_READ_LEN,
            fill: FILL_BYTE,
        }
    }

    /// Server-mode settings; port 0 picks an ephemeral port
    pub fn server(port: u16) -> Config {
        Config {
            mode: Mode::Server,
            port,
            backlog: DEFAULT_BACKLOG,
            read_len: DEFAULT_READ_LEN,
            fill: FILL_BYTE,
        }
    }

    /// Default tracing filter for the `-v` count
    pub fn log_level(verbose: u8) -> &'static str {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// One-line usage, printed when started without arguments
pub fn usage(program: &str) -> String {
    format!("Usage: {} [-s] [host_ip]", program)
}
