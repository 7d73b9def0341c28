use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use sockprobe::command;
use sockprobe::config::{self, Cli, Config};
use sockprobe::dispatcher::{Dispatcher, Progress, Reply};
use sockprobe::outcome::Op;
use sockprobe::render;
use sockprobe::session::{Fatal, Session};
use sockprobe::signal::Interrupt;

/// Prints the progress half of a result line and flushes it, so it is
/// visible while the call blocks.
struct Console;

impl Progress for Console {
    fn begin(&mut self, op: &Op) {
        print!("{} ... ", op.progress());
        let _ = io::stdout().flush();
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Config::log_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read-dispatch-print until `q`, EOF, or a fatal interrupt
fn run(dispatcher: &mut Dispatcher, interrupt: Interrupt) -> Result<(), Fatal> {
    let mut lines = io::stdin().lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let tokens = match lines.next() {
            Some(Ok(line)) => command::tokenize(&line),
            Some(Err(error)) => {
                warn!(%error, "cannot read input");
                vec!["q".to_string()]
            }
            None => vec!["q".to_string()],
        };
        interrupt.clear();

        match dispatcher.dispatch(&tokens, &mut Console)? {
            Reply::Quit => return Ok(()),
            reply => {
                let text = render::reply(&reply);
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(config) = Config::from_cli(&cli) else {
        let program = std::env::args()
            .next()
            .unwrap_or_else(|| "sockprobe".to_string());
        println!("{}", config::usage(&program));
        return Ok(());
    };
    init_logging(cli.verbose);
    debug!(?config, "starting");

    let interrupt = Interrupt::install().context("installing signal handlers")?;
    let mut session = Session::new(&config, interrupt).context("session setup failed")?;

    Console.begin(&session.startup_op());
    let outcome = session.start().context("session setup failed")?;
    println!("{}", render::outcome(&outcome));

    let mut dispatcher = Dispatcher::new(session, &config);
    run(&mut dispatcher, interrupt).context("session aborted")?;
    println!();
    Ok(())
}
