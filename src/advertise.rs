//! Discovery of the address slaves should use to reach this master.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info, instrument, warn};

/// Public address used only to pick a route; no packet is sent to it.
const PROBE_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 9);

/// Returns the local address of the interface holding the default route.
#[instrument]
pub async fn local_address() -> Option<IpAddr> {
    let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
        Ok(socket) => socket,
        Err(e) => {
            debug!(error = %e, "Failed to bind probe socket");
            return None;
        }
    };
    if let Err(e) = socket.connect(PROBE_ADDR).await {
        debug!(error = %e, "No route for address probe");
        return None;
    }
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Returns the addresses assigned to every local network interface.
#[instrument]
pub fn interface_addresses() -> Vec<IpAddr> {
    match get_if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .map(|iface| {
                debug!(name = %iface.name, ip = %iface.ip(), "Found interface");
                iface.ip()
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "Failed to list network interfaces");
            Vec::new()
        }
    }
}

/// Returns true if `addr` belongs to the network described by `prefix`.
///
/// `prefix` is matched textually against the dotted address, so
/// `"192.168.201"` matches `192.168.201.17` but not `192.168.20.1`.
pub fn matches_prefix(addr: &IpAddr, prefix: &str) -> bool {
    let text = addr.to_string();
    let prefix = prefix.trim_end_matches('.');
    text == prefix || text.starts_with(&format!("{}.", prefix))
}

/// Returns the first candidate inside the `prefix` network.
pub fn select_address(candidates: &[IpAddr], prefix: &str) -> Option<IpAddr> {
    candidates
        .iter()
        .copied()
        .find(|addr| matches_prefix(addr, prefix))
}

/// Picks the host to advertise.
///
/// Without a prefix the default-route address is used. With one, the
/// default-route address wins if it matches, then the first matching
/// interface address. Falls back to `bind_host` when nothing fits.
#[instrument]
pub fn choose_host(
    default_route: Option<IpAddr>,
    interfaces: &[IpAddr],
    prefix: Option<&str>,
    bind_host: &str,
) -> String {
    let Some(prefix) = prefix else {
        return match default_route {
            Some(addr) => addr.to_string(),
            None => {
                warn!("Could not determine local address");
                bind_host.to_string()
            }
        };
    };

    match default_route
        .filter(|addr| matches_prefix(addr, prefix))
        .or_else(|| select_address(interfaces, prefix))
    {
        Some(addr) => addr.to_string(),
        None => {
            warn!(
                prefix,
                candidates = interfaces.len(),
                "No interface address matches network prefix"
            );
            bind_host.to_string()
        }
    }
}

/// Discovers local addresses and picks the host to advertise.
#[instrument]
pub async fn discover_host(prefix: Option<&str>, bind_host: &str) -> String {
    let default_route = local_address().await;
    let interfaces = interface_addresses();
    let host = choose_host(default_route, &interfaces, prefix, bind_host);
    info!(%host, "Advertised host chosen");
    host
}
