//! Fixed lab topology: names, addressing, and bridge assignment
//!
//! The lab is always the same shape: N web servers on `lan2`, a balancer
//! routing between `lan1` and `lan2`, and a client on `lan1`. Everything
//! else in the tool derives its addressing from this module.

use color_eyre::{eyre::eyre, Result};
use std::net::Ipv4Addr;

/// Name of the load-balancer VM
pub const BALANCER: &str = "lb";

/// Name of the client VM
pub const CLIENT: &str = "c1";

/// Bridge joining the client and the balancer's outer interface
pub const LAN1: &str = "lan1";

/// Bridge joining the web servers and the balancer's inner interface
pub const LAN2: &str = "lan2";

/// All lab interfaces use a /24
pub const NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// A network interface assignment used while building a domain definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// IPv4 address of the interface
    pub address: Ipv4Addr,
    /// Dotted-quad netmask
    pub mask: Ipv4Addr,
}

/// Name of the i-th web server VM (1-based)
pub fn server_name(index: u32) -> String {
    format!("s{index}")
}

/// Parse a server name back into its 1-based index
///
/// Returns `None` for anything that is not `s<N>` with N >= 1.
pub fn server_index(name: &str) -> Option<u32> {
    name.strip_prefix('s')?.parse().ok().filter(|&i| i >= 1)
}

/// Address of the i-th web server: `10.1.2.{i+10}`
pub fn server_address(index: u32) -> Ipv4Addr {
    Ipv4Addr::new(10, 1, 2, 10 + index as u8)
}

/// Compute the interface list for a VM by name
///
/// Unrecognized names are a configuration error, reported to the caller
/// rather than panicking.
pub fn interfaces_for(name: &str) -> Result<Vec<InterfaceSpec>> {
    if let Some(index) = server_index(name) {
        return Ok(vec![InterfaceSpec {
            address: server_address(index),
            mask: NETMASK,
        }]);
    }

    match name {
        BALANCER => Ok(vec![
            InterfaceSpec {
                address: Ipv4Addr::new(10, 1, 1, 1),
                mask: NETMASK,
            },
            InterfaceSpec {
                address: Ipv4Addr::new(10, 1, 2, 1),
                mask: NETMASK,
            },
        ]),
        CLIENT => Ok(vec![InterfaceSpec {
            address: Ipv4Addr::new(10, 1, 1, 2),
            mask: NETMASK,
        }]),
        _ => Err(eyre!(
            "unrecognized VM name '{name}' (expected s<N>, {BALANCER}, or {CLIENT})"
        )),
    }
}

/// Default gateway for a VM, if it has one
///
/// Servers route via the balancer's inner interface, the client via its
/// outer one. The balancer itself is the router and has no gateway.
pub fn gateway_for(name: &str) -> Option<Ipv4Addr> {
    if server_index(name).is_some() {
        return Some(Ipv4Addr::new(10, 1, 2, 1));
    }
    match name {
        CLIENT => Some(Ipv4Addr::new(10, 1, 1, 1)),
        _ => None,
    }
}

/// Bridge a VM's primary interface attaches to
///
/// Only the five fixed server slots land on `lan2`; servers configured
/// beyond `s5` fall into the `lan1` branch together with everything else.
pub fn bridge_for(name: &str) -> &'static str {
    if matches!(name, "s1" | "s2" | "s3" | "s4" | "s5") {
        LAN2
    } else {
        LAN1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_addresses() {
        for i in 1..=8u32 {
            let specs = interfaces_for(&server_name(i)).unwrap();
            assert_eq!(specs.len(), 1);
            assert_eq!(specs[0].address, Ipv4Addr::new(10, 1, 2, 10 + i as u8));
            assert_eq!(specs[0].mask, Ipv4Addr::new(255, 255, 255, 0));
        }
    }

    #[test]
    fn test_balancer_has_two_interfaces() {
        let specs = interfaces_for(BALANCER).unwrap();
        assert_eq!(
            specs.iter().map(|s| s.address).collect::<Vec<_>>(),
            vec![Ipv4Addr::new(10, 1, 1, 1), Ipv4Addr::new(10, 1, 2, 1)]
        );
    }

    #[test]
    fn test_client_has_one_interface() {
        let specs = interfaces_for(CLIENT).unwrap();
        assert_eq!(
            specs.iter().map(|s| s.address).collect::<Vec<_>>(),
            vec![Ipv4Addr::new(10, 1, 1, 2)]
        );
    }

    #[test]
    fn test_unrecognized_name_is_an_error() {
        assert!(interfaces_for("web1").is_err());
        assert!(interfaces_for("s0").is_err());
        assert!(interfaces_for("ssh").is_err());
        assert!(interfaces_for("").is_err());
    }

    #[test]
    fn test_gateways() {
        assert_eq!(gateway_for("s3"), Some(Ipv4Addr::new(10, 1, 2, 1)));
        assert_eq!(gateway_for(CLIENT), Some(Ipv4Addr::new(10, 1, 1, 1)));
        assert_eq!(gateway_for(BALANCER), None);
    }

    #[test]
    fn test_bridge_assignment() {
        for name in ["s1", "s2", "s3", "s4", "s5"] {
            assert_eq!(bridge_for(name), LAN2);
        }
        // The slot list is fixed: a sixth server does not reach lan2.
        assert_eq!(bridge_for("s6"), LAN1);
        assert_eq!(bridge_for(BALANCER), LAN1);
        assert_eq!(bridge_for(CLIENT), LAN1);
    }

    #[test]
    fn test_server_index_parsing() {
        assert_eq!(server_index("s1"), Some(1));
        assert_eq!(server_index("s12"), Some(12));
        assert_eq!(server_index("s0"), None);
        assert_eq!(server_index("lb"), None);
        assert_eq!(server_index("sx"), None);
    }
}
