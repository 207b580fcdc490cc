//! Socket connection state parsing
//!
//! Turns the kernel-shaped [`SocketInfo`] of a descriptor into endpoints.

use crate::fd::SocketInfo;
use hijack_common::{AF_INET, AF_INET6, AF_UNIX};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Local and remote endpoints of an IPv4 connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
}

/// What the probe can report about a socket
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketClass {
    Inet(Endpoints),
    /// Recognised, endpoints not extracted
    Inet6,
    Unix,
    Unsupported(u16),
}

/// Extract the connection endpoints of an IPv4 socket
///
/// Addresses are stored in network byte order, as is the remote port;
/// the local port is already in host byte order.
pub fn extract_endpoints(info: &SocketInfo) -> Option<Endpoints> {
    // Only handle IPv4 for now
    if info.family != AF_INET {
        return None;
    }

    let local = SocketAddrV4::new(Ipv4Addr::from(u32::from_be(info.local_addr)), info.local_port);
    let remote = SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(info.remote_addr)),
        u16::from_be(info.remote_port),
    );

    Some(Endpoints { local, remote })
}

/// Sort a socket by address family
pub fn classify_socket(info: &SocketInfo) -> SocketClass {
    match info.family {
        AF_INET => match extract_endpoints(info) {
            Some(endpoints) => SocketClass::Inet(endpoints),
            None => SocketClass::Unsupported(info.family),
        },
        AF_INET6 => SocketClass::Inet6,
        AF_UNIX => SocketClass::Unix,
        family => SocketClass::Unsupported(family),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ipv4_endpoints() {
        let info = SocketInfo {
            family: AF_INET,
            local_addr: u32::from(Ipv4Addr::LOCALHOST).to_be(),
            remote_addr: u32::from(Ipv4Addr::new(192, 168, 1, 20)).to_be(),
            local_port: 8080,
            remote_port: 51000u16.to_be(),
        };

        let endpoints = extract_endpoints(&info).unwrap();
        assert_eq!(endpoints.local, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(endpoints.remote, "192.168.1.20:51000".parse().unwrap());
    }

    #[test]
    fn test_round_trip_through_socket_info() {
        let local: SocketAddrV4 = "10.1.2.3:443".parse().unwrap();
        let remote: SocketAddrV4 = "10.9.8.7:61234".parse().unwrap();
        let endpoints = extract_endpoints(&SocketInfo::inet(local, remote)).unwrap();
        assert_eq!(endpoints, Endpoints { local, remote });
    }

    #[test]
    fn test_non_ipv4_families() {
        assert_eq!(extract_endpoints(&SocketInfo::inet6()), None);
        assert_eq!(classify_socket(&SocketInfo::inet6()), SocketClass::Inet6);
        assert_eq!(classify_socket(&SocketInfo::unix()), SocketClass::Unix);

        let netlink = SocketInfo {
            family: 16,
            ..Default::default()
        };
        assert_eq!(classify_socket(&netlink), SocketClass::Unsupported(16));
    }
}
