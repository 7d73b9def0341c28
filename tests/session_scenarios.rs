//! End-to-end scenarios over real loopback connections

mod loopback;

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use libsock::{Errno, Error};
use loopback::{connected_pair, run};
use sockprobe::command;
use sockprobe::dispatcher::{Quiet, Reply};
use sockprobe::handle::LifecycleState;
use sockprobe::outcome::{Outcome, Report};

#[test]
fn client_write_is_read_by_server() {
    let (mut server, mut client) = connected_pair();
    assert_eq!(run(&mut client, "w 3").report(), Some(&Report::Written(3)));
    assert_eq!(
        run(&mut server, "r").report(),
        Some(&Report::Received(b"HHH".to_vec()))
    );
}

#[test]
fn text_write_arrives_verbatim() {
    let (mut server, mut client) = connected_pair();
    assert!(run(&mut client, "w hello").is_success());
    assert_eq!(
        run(&mut server, "rn 5").report(),
        Some(&Report::Received(b"hello".to_vec()))
    );
}

#[test]
fn oversized_counts_are_reported_and_the_session_survives() {
    let (mut server, mut client) = connected_pair();
    assert_eq!(
        run(&mut client, "r 18446744073709551615").os_error(),
        Some(Errno::ENOMEM)
    );
    assert_eq!(
        run(&mut client, "rn 18446744073709551615").os_error(),
        Some(Errno::ENOMEM)
    );
    let reply = client
        .dispatch(&command::tokenize("w 18446744073709551615"), &mut Quiet)
        .unwrap();
    assert!(matches!(reply, Reply::Usage(_)), "{:?}", reply);

    assert!(run(&mut client, "w 2").is_success());
    assert_eq!(
        run(&mut server, "rn 2").report(),
        Some(&Report::Received(b"HH".to_vec()))
    );
}

#[test]
fn poll_on_silent_peer_times_out_after_the_timeout() {
    let (_server, mut client) = connected_pair();
    match run(&mut client, "p 1") {
        Outcome::Timeout { waited, .. } => assert!(waited >= Duration::from_millis(1000)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn writable_poll_returns_at_once() {
    let (_server, mut client) = connected_pair();
    match run(&mut client, "pw 5").report() {
        Some(Report::Ready(ready)) => assert!(ready.writable()),
        other => panic!("expected readiness, got {:?}", other),
    }
}

#[test]
fn double_close_reports_ebadf() {
    let (_server, mut client) = connected_pair();
    assert!(run(&mut client, "c").is_success());
    assert_eq!(client.session().state(), LifecycleState::Closed);
    assert_eq!(run(&mut client, "c").os_error(), Some(Errno::EBADF));
    assert_eq!(run(&mut client, "st").os_error(), Some(Errno::EBADF));
}

#[test]
fn failed_resolution_leaves_session_usable() {
    let (mut server, mut client) = connected_pair();
    assert!(matches!(
        run(&mut client, "res nonexistent.invalid.").report(),
        Some(Report::NoResult { .. })
    ));
    assert!(run(&mut client, "w 1").is_success());
    assert_eq!(
        run(&mut server, "r").report(),
        Some(&Report::Received(b"H".to_vec()))
    );
}

#[test]
fn empty_line_repeats_the_write() {
    let (mut server, mut client) = connected_pair();
    assert!(run(&mut client, "w 5").is_success());
    assert!(run(&mut client, "").is_success());
    assert_eq!(
        run(&mut server, "rn 10").report(),
        Some(&Report::Received(vec![b'H'; 10]))
    );
}

#[test]
fn empty_line_first_is_a_no_op() {
    let (_server, mut client) = connected_pair();
    let reply = client
        .dispatch(&command::tokenize(""), &mut Quiet)
        .unwrap();
    assert_eq!(reply, Reply::Idle);
}

#[test]
fn peer_shutdown_reads_as_zero_bytes() {
    let (mut server, mut client) = connected_pair();
    assert!(run(&mut client, "stw").is_success());
    assert_eq!(client.session().state(), LifecycleState::HalfClosedWrite);
    assert_eq!(
        run(&mut server, "r").report(),
        Some(&Report::Received(Vec::new()))
    );
    match run(&mut server, "rn 4") {
        Outcome::Error {
            transferred, error, ..
        } => {
            assert_eq!(transferred, Some(0));
            assert_eq!(error, Error::Eof);
        }
        other => panic!("expected EOF error, got {:?}", other),
    }
}

#[test]
fn write_to_closed_peer_is_an_error_not_a_signal() {
    let (mut server, mut client) = connected_pair();
    assert!(run(&mut client, "c").is_success());

    let mut last = None;
    for _ in 0..50 {
        let outcome = run(&mut server, "w 1024");
        if outcome.is_error() {
            last = outcome.os_error();
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(
        matches!(last, Some(Errno::EPIPE) | Some(Errno::ECONNRESET)),
        "{:?}",
        last
    );
}

#[test]
fn server_reaccept_replaces_the_connection() {
    let (mut server, mut first) = connected_pair();
    let target = match server.session().listen_addr() {
        Some(addr) => std::net::SocketAddrV4::new(std::net::Ipv4Addr::LOCALHOST, addr.port()),
        None => panic!("server is not listening"),
    };
    let _second = TcpStream::connect(target).unwrap();
    assert!(matches!(
        run(&mut server, "rc").report(),
        Some(Report::Accepted(_))
    ));
    assert_eq!(server.session().state(), LifecycleState::Established);

    // The first connection was closed by the re-accept.
    assert_eq!(
        run(&mut first, "r").report(),
        Some(&Report::Received(Vec::new()))
    );
}

#[test]
fn status_reports_lifecycle() {
    let (_server, mut client) = connected_pair();
    match run(&mut client, "st").report() {
        Some(Report::Status(counters)) => assert!(counters
            .iter()
            .any(|c| c.name == "lifecycle" && c.value == "ESTABLISHED")),
        other => panic!("expected status, got {:?}", other),
    }
}
