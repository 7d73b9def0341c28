//! Host name resolution
//!
//! Wraps the system resolver (`getaddrinfo`), so `/etc/hosts`, nsswitch and
//! the configured DNS servers all apply. No socket of the caller is touched.
//!
//! # Example
//!
//! ```rust,no_run
//! use libsock::dns::resolve;
//!
//! match resolve("localhost") {
//!     Ok(result) => println!("addresses: {:?}", result.addrs),
//!     Err(e) => println!("no result: {}", e),
//! }
//! ```

use std::ffi::{CStr, CString};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ptr;

use crate::errno::Errno;

// ============================================================================
// Constants
// ============================================================================

/// Maximum hostname length
pub const MAX_HOSTNAME_LEN: usize = 255;

// ============================================================================
// Error Types
// ============================================================================

/// Name resolution error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Hostname too long
    HostnameTooLong,
    /// Invalid hostname format (empty or containing NUL)
    InvalidHostname,
    /// Resolver failure, with the `EAI_*` code and its message
    Lookup { code: i32, message: String },
    /// Resolver hit a system error (`EAI_SYSTEM`)
    System(Errno),
    /// Lookup succeeded but produced no address
    NoAddress,
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsError::HostnameTooLong => write!(f, "hostname too long"),
            DnsError::InvalidHostname => write!(f, "invalid hostname"),
            DnsError::Lookup { code, message } => write!(f, "{} ({})", message, code),
            DnsError::System(errno) => write!(f, "{}", errno),
            DnsError::NoAddress => write!(f, "no address records"),
        }
    }
}

impl std::error::Error for DnsError {}

// ============================================================================
// Result Types
// ============================================================================

/// Resolution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResult {
    /// Canonical name reported by the resolver
    pub canonical_name: Option<String>,
    /// Other names the host is known by (the queried name when it was an alias)
    pub aliases: Vec<String>,
    /// All addresses, in resolver order, without duplicates
    pub addrs: Vec<IpAddr>,
}

/// Frees the `getaddrinfo` list when dropped
struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { libc::freeaddrinfo(self.0) };
        }
    }
}

fn sockaddr_ip(ai: &libc::addrinfo) -> Option<IpAddr> {
    if ai.ai_addr.is_null() {
        return None;
    }
    match ai.ai_family {
        libc::AF_INET => {
            let sin = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in) };
            Some(IpAddr::V4(Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes())))
        }
        libc::AF_INET6 => {
            let sin6 = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in6) };
            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}

fn validate(hostname: &str) -> Result<CString, DnsError> {
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(DnsError::HostnameTooLong);
    }
    if hostname.is_empty() {
        return Err(DnsError::InvalidHostname);
    }
    CString::new(hostname).map_err(|_| DnsError::InvalidHostname)
}

/// Resolve a hostname to all of its addresses
///
/// # Arguments
/// * `hostname` - Name or numeric address to look up
///
/// # Returns
/// Canonical name, aliases and addresses, or DnsError when nothing resolved
pub fn resolve(hostname: &str) -> Result<DnsResult, DnsError> {
    let name = validate(hostname)?;

    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;
    hints.ai_flags = libc::AI_CANONNAME;

    let mut head: *mut libc::addrinfo = ptr::null_mut();
    let code = unsafe { libc::getaddrinfo(name.as_ptr(), ptr::null(), &hints, &mut head) };
    let list = AddrInfoList(head);
    if code != 0 {
        if code == libc::EAI_SYSTEM {
            return Err(DnsError::System(Errno::last()));
        }
        let message = unsafe { CStr::from_ptr(libc::gai_strerror(code)) }
            .to_string_lossy()
            .into_owned();
        log::debug!("getaddrinfo({}) failed: {}", hostname, message);
        return Err(DnsError::Lookup { code, message });
    }

    let mut result = DnsResult {
        canonical_name: None,
        aliases: Vec::new(),
        addrs: Vec::new(),
    };
    let mut cursor = list.0;
    while !cursor.is_null() {
        let ai = unsafe { &*cursor };
        if result.canonical_name.is_none() && !ai.ai_canonname.is_null() {
            let canon = unsafe { CStr::from_ptr(ai.ai_canonname) };
            result.canonical_name = Some(canon.to_string_lossy().into_owned());
        }
        if let Some(ip) = sockaddr_ip(ai) {
            if !result.addrs.contains(&ip) {
                result.addrs.push(ip);
            }
        }
        cursor = ai.ai_next;
    }

    if result.addrs.is_empty() {
        return Err(DnsError::NoAddress);
    }
    if let Some(canon) = &result.canonical_name {
        let queried = hostname.trim_end_matches('.');
        if !canon.eq_ignore_ascii_case(queried) && queried.parse::<IpAddr>().is_err() {
            result.aliases.push(queried.to_string());
        }
    }
    Ok(result)
}

/// Resolve a hostname to its first IPv4 address
pub fn resolve_ipv4(hostname: &str) -> Result<Ipv4Addr, DnsError> {
    resolve(hostname)?
        .addrs
        .into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or(DnsError::NoAddress)
}
