//! Start-time guest configuration
//!
//! Before a VM boots, its overlay image gets a hostname, static network
//! configuration, and a role-specific payload: the balancer receives IP
//! forwarding plus an HAProxy config for the fixed server pool, the web
//! servers a per-VM index page. All generated files are staged under
//! `tmp_configs/<name>/` so the destroy sweep collects them.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{eyre::Context as _, Result};
use indoc::indoc;
use std::fs;
use tracing::debug;

use crate::guest;
use crate::topology;

/// Directory (relative to the working directory) holding staged guest files
pub const CONFIG_DIR: &str = "tmp_configs";

/// Render `/etc/network/interfaces` for a VM in Debian syntax
///
/// One static stanza per interface; the gateway, when the VM has one, goes
/// into the last stanza.
pub fn interfaces_file(name: &str) -> Result<String> {
    let specs = topology::interfaces_for(name)?;

    let mut out = String::from("auto lo\niface lo inet loopback\n");
    for (index, spec) in specs.iter().enumerate() {
        out.push_str(&format!(
            "\nauto eth{index}\niface eth{index} inet static\n    address {}\n    netmask {}\n",
            spec.address, spec.mask
        ));
    }
    if let Some(gateway) = topology::gateway_for(name) {
        out.push_str(&format!("    gateway {gateway}\n"));
    }

    Ok(out)
}

/// Render the HAProxy configuration for the balancer
///
/// The backend pool is the fixed `s1..s3` trio regardless of how many
/// servers the lab was built with.
pub fn haproxy_config() -> String {
    let mut cfg = String::from(indoc! {"
        frontend lb
            bind *:80
            mode http
            default_backend webservers

        backend webservers
            mode http
            balance roundrobin
    "});
    for index in 1..=3u32 {
        cfg.push_str(&format!(
            "    server s{index} {}:80 check\n",
            topology::server_address(index)
        ));
    }
    cfg
}

/// Render the static index page served by a web server VM
pub fn index_page(name: &str) -> String {
    format!("<html><body><h1>Server {name}</h1></body></html>")
}

/// Stage and inject all guest configuration for one VM
///
/// Every injection is a separate external call; the first failure aborts
/// this VM's provisioning and is reported to the caller. Other VMs are
/// unaffected.
pub fn inject_configs(name: &str, workdir: &Utf8Path) -> Result<()> {
    let image = workdir.join(format!("{name}.qcow2"));
    let config_dir = workdir.join(CONFIG_DIR).join(name);
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir))?;

    let hostname_path = stage_file(&config_dir, "hostname", name)?;
    let interfaces_path = stage_file(&config_dir, "interfaces", &interfaces_file(name)?)?;

    guest::copy_in(&image, &hostname_path, "/etc")?;
    guest::copy_in(&image, &interfaces_path, "/etc/network")?;
    guest::edit(
        &image,
        "/etc/hosts",
        &format!("s/127.0.1.1.*/127.0.1.1 {name}/"),
    )?;
    debug!("hostname and network configuration injected into {name}");

    if name == topology::BALANCER {
        // The balancer routes between the two LANs and fronts the pool.
        guest::edit(
            &image,
            "/etc/sysctl.conf",
            "s/#net.ipv4.ip_forward=1/net.ipv4.ip_forward=1/",
        )?;

        let haproxy_path = stage_file(&config_dir, "haproxy.cfg", &haproxy_config())?;
        guest::copy_in(&image, &haproxy_path, "/etc/haproxy/")?;
        guest::edit(
            &image,
            "/etc/rc.local",
            "s|^exit 0|service haproxy restart\nexit 0|",
        )?;
        debug!("ip forwarding and haproxy configuration injected into {name}");
    }

    if topology::server_index(name).is_some() {
        let index_path = stage_file(&config_dir, "index.html", &index_page(name))?;
        guest::copy_in(&image, &index_path, "/var/www/html/")?;
        guest::edit(
            &image,
            "/etc/rc.local",
            "s|^exit 0|service apache2 restart\nexit 0|",
        )?;
        debug!("web content injected into {name}");
    }

    // Read the result back for the operator; failure here is harmless.
    match guest::cat(&image, "/etc/network/interfaces") {
        Ok(content) => debug!("effective network config for {name}:\n{content}"),
        Err(e) => debug!("could not read back network config for {name}: {e:#}"),
    }

    Ok(())
}

fn stage_file(config_dir: &Utf8Path, file_name: &str, content: &str) -> Result<Utf8PathBuf> {
    let path = config_dir.join(file_name);
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_server_interfaces_file() {
        let expected = indoc! {"
            auto lo
            iface lo inet loopback

            auto eth0
            iface eth0 inet static
                address 10.1.2.12
                netmask 255.255.255.0
                gateway 10.1.2.1
        "};
        assert_eq!(interfaces_file("s2").unwrap(), expected);
    }

    #[test]
    fn test_balancer_interfaces_file_has_no_gateway() {
        let expected = indoc! {"
            auto lo
            iface lo inet loopback

            auto eth0
            iface eth0 inet static
                address 10.1.1.1
                netmask 255.255.255.0

            auto eth1
            iface eth1 inet static
                address 10.1.2.1
                netmask 255.255.255.0
        "};
        assert_eq!(interfaces_file("lb").unwrap(), expected);
    }

    #[test]
    fn test_client_interfaces_file() {
        let content = interfaces_file("c1").unwrap();
        assert!(content.contains("address 10.1.1.2"));
        assert!(content.contains("gateway 10.1.1.1"));
        assert_eq!(content.matches("inet static").count(), 1);
    }

    #[test]
    fn test_interfaces_file_rejects_unknown_name() {
        assert!(interfaces_file("router9").is_err());
    }

    #[test]
    fn test_haproxy_pool() {
        let expected = indoc! {"
            frontend lb
                bind *:80
                mode http
                default_backend webservers

            backend webservers
                mode http
                balance roundrobin
                server s1 10.1.2.11:80 check
                server s2 10.1.2.12:80 check
                server s3 10.1.2.13:80 check
        "};
        assert_eq!(haproxy_config(), expected);
    }

    #[test]
    fn test_index_page() {
        assert_eq!(
            index_page("s3"),
            "<html><body><h1>Server s3</h1></body></html>"
        );
    }
}
