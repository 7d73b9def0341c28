//! Shared helpers: a server and a client session joined over 127.0.0.1

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddrV4};

use sockprobe::command;
use sockprobe::config::Config;
use sockprobe::dispatcher::{Dispatcher, Quiet, Reply};
use sockprobe::outcome::Outcome;
use sockprobe::session::Session;
use sockprobe::signal::Interrupt;

/// A listening server dispatcher on an ephemeral port
pub fn server() -> (Dispatcher, SocketAddrV4) {
    let session = Session::listen(0, 5, Interrupt::detached()).expect("listen");
    let port = session.listen_addr().expect("bound address").port();
    (
        Dispatcher::new(session, &Config::server(port)),
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, port),
    )
}

/// A client dispatcher aimed at `target`, not yet connected
pub fn client(target: SocketAddrV4) -> Dispatcher {
    let session = Session::client(target, Interrupt::detached()).expect("client socket");
    Dispatcher::new(session, &Config::client(*target.ip(), target.port()))
}

/// (server, client) after connect and accept both succeeded
pub fn connected_pair() -> (Dispatcher, Dispatcher) {
    let (mut server, target) = server();
    let mut client = client(target);
    let connected = client.session_mut().start().expect("connect");
    assert!(connected.is_success(), "connect: {:?}", connected);
    let accepted = server.session_mut().start().expect("accept");
    assert!(accepted.is_success(), "accept: {:?}", accepted);
    (server, client)
}

/// Dispatch one input line and expect an outcome back
pub fn run(dispatcher: &mut Dispatcher, line: &str) -> Outcome {
    match dispatcher
        .dispatch(&command::tokenize(line), &mut Quiet)
        .expect("no fatal error")
    {
        Reply::Outcome(outcome) => outcome,
        other => panic!("{:?} gave {:?}", line, other),
    }
}
