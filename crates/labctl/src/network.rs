//! OVS bridge lifecycle and host-side routing
//!
//! Each lab network is an Open vSwitch bridge with a statically assigned
//! subnet address. The host also joins `lan1` on `start` so the operator
//! can reach the lab through the balancer.

use color_eyre::{eyre::Context as _, Result};
use std::net::Ipv4Addr;
use std::process::Command;
use tracing::info;

use crate::cmdext::CommandRunExt;
use crate::topology;

/// A named virtual switch with its subnet address
#[derive(Debug, Clone, Copy)]
pub struct Network {
    /// Bridge name (also the OS-level interface name)
    pub name: &'static str,
    /// Subnet address assigned to the bridge
    pub address: Ipv4Addr,
    /// Prefix length of the subnet
    pub prefix: u8,
}

/// The two fixed lab networks
pub const LAB_NETWORKS: [Network; 2] = [
    Network {
        name: topology::LAN1,
        address: Ipv4Addr::new(10, 1, 1, 0),
        prefix: 24,
    },
    Network {
        name: topology::LAN2,
        address: Ipv4Addr::new(10, 1, 2, 0),
        prefix: 24,
    },
];

impl Network {
    /// Create the bridge, assign its address, and bring it up
    pub fn create(&self) -> Result<()> {
        Command::new("ovs-vsctl")
            .args(["add-br", self.name])
            .run()
            .with_context(|| format!("Failed to create bridge {}", self.name))?;

        Command::new("ip")
            .args([
                "addr",
                "add",
                &format!("{}/{}", self.address, self.prefix),
                "dev",
                self.name,
            ])
            .run()
            .with_context(|| format!("Failed to assign address to bridge {}", self.name))?;

        Command::new("ip")
            .args(["link", "set", "dev", self.name, "up"])
            .run()
            .with_context(|| format!("Failed to bring up bridge {}", self.name))?;

        info!(
            "network {} created ({}/{})",
            self.name, self.address, self.prefix
        );
        Ok(())
    }

    /// Delete the bridge
    pub fn destroy(&self) -> Result<()> {
        Command::new("ovs-vsctl")
            .args(["del-br", self.name])
            .run()
            .with_context(|| format!("Failed to delete bridge {}", self.name))?;

        info!("network {} deleted", self.name);
        Ok(())
    }
}

/// Attach the host to the lab after the VMs are up
///
/// Brings up `lan1` with a host-side address, routes the lab supernet via
/// the balancer, and brings up `lan2`.
pub fn configure_host_routing() -> Result<()> {
    Command::new("ip")
        .args(["link", "set", topology::LAN1, "up"])
        .run()
        .context("Failed to bring up lan1")?;

    Command::new("ip")
        .args(["addr", "add", "10.1.1.3/24", "dev", topology::LAN1])
        .run()
        .context("Failed to assign host address on lan1")?;

    Command::new("ip")
        .args(["route", "add", "10.1.0.0/16", "via", "10.1.1.1"])
        .run()
        .context("Failed to add route to the lab subnet")?;

    Command::new("ip")
        .args(["link", "set", topology::LAN2, "up"])
        .run()
        .context("Failed to bring up lan2")?;

    info!("host attached to lan1 (10.1.1.3) with lab route via 10.1.1.1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_lab_networks() {
        assert_eq!(LAB_NETWORKS[0].name, "lan1");
        assert_eq!(LAB_NETWORKS[0].address, Ipv4Addr::new(10, 1, 1, 0));
        assert_eq!(LAB_NETWORKS[1].name, "lan2");
        assert_eq!(LAB_NETWORKS[1].address, Ipv4Addr::new(10, 1, 2, 0));
        assert!(LAB_NETWORKS.iter().all(|n| n.prefix == 24));
    }
}
