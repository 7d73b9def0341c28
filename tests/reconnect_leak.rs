//! Repeated server re-accepts must not leak descriptors.
//!
//! Kept in its own test binary so no other test opens or closes descriptors
//! while they are counted.

mod loopback;

use std::net::TcpStream;

use loopback::{connected_pair, run};
use sockprobe::outcome::Report;

#[cfg(target_os = "linux")]
fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

#[cfg(target_os = "linux")]
#[test]
fn repeated_reaccept_keeps_descriptor_count_flat() {
    let (mut server, client) = connected_pair();
    drop(client);
    let target = server.session().listen_addr().unwrap();
    let target = std::net::SocketAddrV4::new(std::net::Ipv4Addr::LOCALHOST, target.port());

    let baseline = open_descriptors();
    for _ in 0..20 {
        let peer = TcpStream::connect(target).unwrap();
        assert!(matches!(
            run(&mut server, "rc").report(),
            Some(Report::Accepted(_))
        ));
        drop(peer);
    }
    assert_eq!(open_descriptors(), baseline);
}
