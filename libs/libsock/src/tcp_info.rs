//! `TCP_INFO` socket option
//!
//! Linux only. Elsewhere [`tcp_info`] fails with `ENOPROTOOPT` and
//! [`TcpInfo`] cannot be constructed.

use crate::error::Error;
use crate::types::Fd;

/// Kernel TCP state and counters for one socket
#[cfg(target_os = "linux")]
#[derive(Clone, Copy)]
pub struct TcpInfo(libc::tcp_info);

#[cfg(not(target_os = "linux"))]
#[derive(Clone, Copy)]
pub enum TcpInfo {}

#[cfg(target_os = "linux")]
impl TcpInfo {
    /// Name of the state as the kernel's TCP_* state constants spell it
    pub fn state_name(&self) -> &'static str {
        match self.0.tcpi_state {
            1 => "ESTABLISHED",
            2 => "SYN_SENT",
            3 => "SYN_RECV",
            4 => "FIN_WAIT1",
            5 => "FIN_WAIT2",
            6 => "TIME_WAIT",
            7 => "CLOSE",
            8 => "CLOSE_WAIT",
            9 => "LAST_ACK",
            10 => "LISTEN",
            11 => "CLOSING",
            _ => "UNKNOWN",
        }
    }

    /// Named counters; times in microseconds (`_us`) or milliseconds (`_ms`)
    pub fn counters(&self) -> Vec<(&'static str, u32)> {
        let i = &self.0;
        vec![
            ("rtt_us", i.tcpi_rtt),
            ("rttvar_us", i.tcpi_rttvar),
            ("rto_us", i.tcpi_rto),
            ("snd_cwnd", i.tcpi_snd_cwnd),
            ("snd_ssthresh", i.tcpi_snd_ssthresh),
            ("snd_mss", i.tcpi_snd_mss),
            ("rcv_mss", i.tcpi_rcv_mss),
            ("pmtu", i.tcpi_pmtu),
            ("unacked", i.tcpi_unacked),
            ("sacked", i.tcpi_sacked),
            ("lost", i.tcpi_lost),
            ("retrans", i.tcpi_retrans),
            ("retransmits", u32::from(i.tcpi_retransmits)),
            ("total_retrans", i.tcpi_total_retrans),
            ("rcv_space", i.tcpi_rcv_space),
            ("last_data_recv_ms", i.tcpi_last_data_recv),
            ("last_data_sent_ms", i.tcpi_last_data_sent),
        ]
    }
}

#[cfg(not(target_os = "linux"))]
impl TcpInfo {
    pub fn state_name(&self) -> &'static str {
        match *self {}
    }

    pub fn counters(&self) -> Vec<(&'static str, u32)> {
        match *self {}
    }
}

/// Read `TCP_INFO` for a socket
#[cfg(target_os = "linux")]
pub fn tcp_info(fd: Fd) -> Result<TcpInfo, Error> {
    let mut info: libc::tcp_info = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::tcp_info>() as libc::socklen_t;
    let ret = unsafe {
        libc::getsockopt(
            fd.raw(),
            libc::IPPROTO_TCP,
            libc::TCP_INFO,
            &mut info as *mut libc::tcp_info as *mut libc::c_void,
            &mut len,
        )
    };
    Error::from_ret(ret).map(|_| TcpInfo(info))
}

#[cfg(not(target_os = "linux"))]
pub fn tcp_info(_fd: Fd) -> Result<TcpInfo, Error> {
    Err(Error::Os(crate::Errno::ENOPROTOOPT))
}
