//! Network availability probes.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use tracing::debug;

/// Decides whether the host can currently reach a target.
pub trait NetworkProbe: Send + Sync + fmt::Debug {
    /// True if a connection attempt to `target` is worth making.
    fn is_available(&self, target: SocketAddrV4) -> bool;
}

/// Asks the routing table: connecting a UDP socket sends nothing but fails
/// when no route to the target exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteProbe;

impl NetworkProbe for RouteProbe {
    fn is_available(&self, target: SocketAddrV4) -> bool {
        let socket = match UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)) {
            Ok(socket) => socket,
            Err(e) => {
                debug!("Route probe could not bind: {}", e);
                return false;
            }
        };
        match socket.connect(target) {
            Ok(()) => true,
            Err(e) => {
                debug!("No route to {}: {}", target, e);
                false
            }
        }
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticProbe(pub bool);

impl NetworkProbe for StaticProbe {
    fn is_available(&self, _target: SocketAddrV4) -> bool {
        self.0
    }
}
