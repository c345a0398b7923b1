//! Domain definition builder
//!
//! Materializes a per-VM libvirt domain definition from the shared XML
//! template: duplicate the template to `<name>.xml`, rewrite the identifying
//! fields, wire the network interface to the right OVS bridge, and register
//! the result with the hypervisor as an idempotent upsert.

use camino::Utf8Path;
use color_eyre::{eyre::eyre, eyre::Context as _, Result};
use std::fs;
use tracing::{debug, info};

use crate::libvirt::LibvirtOptions;
use crate::topology;
use crate::xml_utils::{parse_xml_dom, XmlNode};

/// Shared domain XML template every lab VM is stamped from
pub const DOMAIN_TEMPLATE: &str = "vm-template.xml";

/// Rewrite the template XML for one VM
///
/// The template schema is fixed: a root element with `name`,
/// `devices/disk/source[@file]`, and `devices/interface/source[@bridge]`.
/// Edits applied, in order:
/// - `name` text becomes the VM name
/// - the disk source points at the VM's overlay image
/// - the interface gains an OVS `virtualport` and its bridge is selected
///   by [`topology::bridge_for`]
/// - the balancer gains a second interface on `lan2` (virtio model, its
///   own virtualport)
pub fn customize_template(template_xml: &str, name: &str, disk_path: &Utf8Path) -> Result<String> {
    let mut root = parse_xml_dom(template_xml)?;

    let name_node = root
        .child_mut("name")
        .ok_or_else(|| eyre!("domain template has no <name> element"))?;
    name_node.text = name.to_string();

    let disk_source = root
        .descend_mut(&["devices", "disk", "source"])
        .ok_or_else(|| eyre!("domain template has no <devices>/<disk>/<source> element"))?;
    disk_source.set_attr("file", disk_path.as_str());

    let interface = root
        .descend_mut(&["devices", "interface"])
        .ok_or_else(|| eyre!("domain template has no <devices>/<interface> element"))?;
    interface.push_child(XmlNode::new("virtualport").with_attr("type", "openvswitch"));

    let bridge = topology::bridge_for(name);
    let iface_source = interface
        .child_mut("source")
        .ok_or_else(|| eyre!("domain template interface has no <source> element"))?;
    iface_source.set_attr("bridge", bridge);
    debug!("interface for {name} attached to bridge {bridge}");

    if name == topology::BALANCER {
        let devices = root
            .child_mut("devices")
            .ok_or_else(|| eyre!("domain template has no <devices> element"))?;
        let mut second = XmlNode::new("interface").with_attr("type", "bridge");
        second.push_child(XmlNode::new("source").with_attr("bridge", topology::LAN2));
        second.push_child(XmlNode::new("model").with_attr("type", "virtio"));
        second.push_child(XmlNode::new("virtualport").with_attr("type", "openvswitch"));
        devices.push_child(second);
        debug!("second interface on {} added for {name}", topology::LAN2);
    }

    root.to_document_string()
}

/// Build and register the domain definition for one VM
///
/// `workdir` must be absolute; the disk path written into the definition
/// is `<workdir>/<name>.qcow2`. Any stale definition with the same name is
/// removed first, treating absence as the normal case.
pub fn define_domain(
    name: &str,
    template: &Utf8Path,
    workdir: &Utf8Path,
    libvirt: &LibvirtOptions,
) -> Result<()> {
    let xml_path = workdir.join(format!("{name}.xml"));
    let disk_path = workdir.join(format!("{name}.qcow2"));

    let template_xml = fs::read_to_string(template)
        .with_context(|| format!("Failed to read domain template: {}", template))?;

    let domain_xml = customize_template(&template_xml, name, &disk_path)?;
    fs::write(&xml_path, domain_xml)
        .with_context(|| format!("Failed to write domain XML: {}", xml_path))?;

    // Upsert: drop any previous definition, ignoring not-found.
    if let Err(e) = libvirt.undefine(name) {
        debug!("domain {name} was not previously defined: {e:#}");
    }
    libvirt.define(&xml_path)?;
    info!("domain {name} defined from {xml_path}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<domain type="kvm">
  <name>base</name>
  <memory unit="MiB">256</memory>
  <vcpu>1</vcpu>
  <devices>
    <disk type="file" device="disk">
      <driver name="qemu" type="qcow2"/>
      <source file="/srv/lab-assets/lab-base.qcow2"/>
      <target dev="vda" bus="virtio"/>
    </disk>
    <interface type="bridge">
      <source bridge="virbr0"/>
      <model type="virtio"/>
    </interface>
    <console type="pty"/>
  </devices>
</domain>"#;

    fn customize(name: &str) -> XmlNode {
        let disk = Utf8PathBuf::from(format!("/work/{name}.qcow2"));
        let xml = customize_template(TEMPLATE, name, &disk).unwrap();
        parse_xml_dom(&xml).unwrap()
    }

    #[test]
    fn test_server_template_edits() {
        let dom = customize("s1");
        assert_eq!(dom.child("name").map(|n| n.text.as_str()), Some("s1"));
        assert_eq!(
            dom.descend(&["devices", "disk", "source"])
                .and_then(|n| n.attr("file")),
            Some("/work/s1.qcow2")
        );

        let iface = dom.descend(&["devices", "interface"]).unwrap();
        assert_eq!(
            iface.child("source").and_then(|n| n.attr("bridge")),
            Some("lan2")
        );
        assert_eq!(
            iface.child("virtualport").and_then(|n| n.attr("type")),
            Some("openvswitch")
        );
    }

    #[test]
    fn test_client_lands_on_lan1() {
        let dom = customize("c1");
        let iface = dom.descend(&["devices", "interface"]).unwrap();
        assert_eq!(
            iface.child("source").and_then(|n| n.attr("bridge")),
            Some("lan1")
        );

        let interfaces: Vec<_> = dom
            .child("devices")
            .unwrap()
            .children
            .iter()
            .filter(|c| c.name == "interface")
            .collect();
        assert_eq!(interfaces.len(), 1);
    }

    #[test]
    fn test_sixth_server_falls_back_to_lan1() {
        let dom = customize("s6");
        let iface = dom.descend(&["devices", "interface"]).unwrap();
        assert_eq!(
            iface.child("source").and_then(|n| n.attr("bridge")),
            Some("lan1")
        );
    }

    #[test]
    fn test_balancer_gets_second_interface() {
        let dom = customize("lb");
        let interfaces: Vec<_> = dom
            .child("devices")
            .unwrap()
            .children
            .iter()
            .filter(|c| c.name == "interface")
            .collect();
        assert_eq!(interfaces.len(), 2);

        assert_eq!(
            interfaces[0].child("source").and_then(|n| n.attr("bridge")),
            Some("lan1")
        );

        let second = interfaces[1];
        assert_eq!(second.attr("type"), Some("bridge"));
        assert_eq!(
            second.child("source").and_then(|n| n.attr("bridge")),
            Some("lan2")
        );
        assert_eq!(
            second.child("model").and_then(|n| n.attr("type")),
            Some("virtio")
        );
        assert_eq!(
            second.child("virtualport").and_then(|n| n.attr("type")),
            Some("openvswitch")
        );
    }

    #[test]
    fn test_untouched_elements_survive() {
        let dom = customize("s2");
        assert_eq!(
            dom.child("memory").map(|n| n.text.as_str()),
            Some("256")
        );
        assert!(dom.descend(&["devices", "console"]).is_some());
        assert_eq!(
            dom.descend(&["devices", "disk", "driver"])
                .and_then(|n| n.attr("type")),
            Some("qcow2")
        );
    }

    #[test]
    fn test_template_without_interface_is_an_error() {
        let broken = "<domain><name>x</name><devices><disk><source/></disk></devices></domain>";
        let disk = Utf8PathBuf::from("/work/x.qcow2");
        assert!(customize_template(broken, "x", &disk).is_err());
    }
}
