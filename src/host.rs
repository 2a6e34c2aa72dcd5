//! Finding the address other devices should use to reach this host.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// The local address of the interface that routes to the wider network.
///
/// Connecting a UDP socket sends nothing; it only asks the OS to pick a
/// route. Falls back to loopback on hosts without one.
pub fn local_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// The URL to hand to other devices.
pub fn share_url(port: u16) -> String {
    url_for(local_ip(), port)
}

fn url_for(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("http://{v4}:{port}"),
        IpAddr::V6(v6) => format!("http://[{v6}]:{port}"),
    }
}
