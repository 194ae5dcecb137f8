//! Configuration entry builders for vswitch and workload agents

use nsc_cfgmgr_common::{field_values, FieldValues};

use crate::collaborators::ConfigEntryBuilder;
use crate::tables::{entry_kind, if_fields, if_type, xconnect_fields, MEMIF_SOCKET_DIR};
use crate::types::ConfigEntry;

/// Build the unique key of an entry applied by `agent`
pub fn entry_key(agent: &str, kind: &str, name: &str) -> String {
    format!("{}/{}/{}", agent, kind, name)
}

fn interface_entry(agent: &str, name: &str, fields: FieldValues) -> ConfigEntry {
    ConfigEntry {
        key: entry_key(agent, entry_kind::INTERFACE, name),
        agent: agent.to_string(),
        kind: entry_kind::INTERFACE.to_string(),
        fields,
    }
}

/// Build a one-directional L2 cross-connect entry
///
/// Frames received on `rx_if` are transmitted on `tx_if`. The entry is
/// keyed by the receive side, so each interface has at most one.
pub fn build_xconnect_entry(agent: &str, rx_if: &str, tx_if: &str) -> ConfigEntry {
    ConfigEntry {
        key: entry_key(agent, entry_kind::XCONNECT, rx_if),
        agent: agent.to_string(),
        kind: entry_kind::XCONNECT.to_string(),
        fields: field_values! {
            xconnect_fields::RX_INTERFACE => rx_if,
            xconnect_fields::TX_INTERFACE => tx_if,
        },
    }
}

/// Build a memif interface entry
pub fn build_memif_entry(
    agent: &str,
    name: &str,
    memif_id: u32,
    master: bool,
    socket: &str,
    mtu: Option<u32>,
) -> ConfigEntry {
    let mut fields = field_values! {
        if_fields::TYPE => if_type::MEMIF,
        if_fields::ENABLED => true,
        if_fields::MEMIF_ID => memif_id,
        if_fields::MEMIF_MASTER => master,
        if_fields::MEMIF_SOCKET => socket,
    };
    if let Some(mtu) = mtu {
        fields.push((if_fields::MTU.to_string(), mtu.to_string()));
    }
    interface_entry(agent, name, fields)
}

/// Build a veth entry; `peer` names the other end of the pair
pub fn build_veth_entry(agent: &str, name: &str, host_if_name: &str, peer: &str) -> ConfigEntry {
    interface_entry(
        agent,
        name,
        field_values! {
            if_fields::TYPE => if_type::VETH,
            if_fields::ENABLED => true,
            if_fields::HOST_IF_NAME => host_if_name,
            if_fields::PEER_IF_NAME => peer,
        },
    )
}

/// Build an af-packet entry attaching the vswitch to a host-side interface
pub fn build_afpacket_entry(agent: &str, name: &str, host_if_name: &str) -> ConfigEntry {
    interface_entry(
        agent,
        name,
        field_values! {
            if_fields::TYPE => if_type::AF_PACKET,
            if_fields::ENABLED => true,
            if_fields::HOST_IF_NAME => host_if_name,
        },
    )
}

/// Build a tap entry
pub fn build_tap_entry(agent: &str, name: &str, host_if_name: &str) -> ConfigEntry {
    interface_entry(
        agent,
        name,
        field_values! {
            if_fields::TYPE => if_type::TAP,
            if_fields::ENABLED => true,
            if_fields::HOST_IF_NAME => host_if_name,
        },
    )
}

/// Build a physical interface entry
pub fn build_ethernet_entry(agent: &str, name: &str, mtu: Option<u32>) -> ConfigEntry {
    let mut fields = field_values! {
        if_fields::TYPE => if_type::ETHERNET,
        if_fields::ENABLED => true,
    };
    if let Some(mtu) = mtu {
        fields.push((if_fields::MTU.to_string(), mtu.to_string()));
    }
    interface_entry(agent, name, fields)
}

/// Build a vxlan tunnel interface entry
pub fn build_vxlan_entry(agent: &str, name: &str, src: &str, dst: &str, vni: u32) -> ConfigEntry {
    interface_entry(
        agent,
        name,
        field_values! {
            if_fields::TYPE => if_type::VXLAN_TUNNEL,
            if_fields::ENABLED => true,
            if_fields::VXLAN_SRC => src,
            if_fields::VXLAN_DST => dst,
            if_fields::VXLAN_VNI => vni,
        },
    )
}

/// Socket the vswitch serves for every switch-backed memif of `owner`
pub fn memif_socket_path(host: &str, owner: &str) -> String {
    format!("{}/memif_{}_{}.sock", MEMIF_SOCKET_DIR, host, owner)
}

/// Socket of a direct pairing, served by `master` and dialed by `slave`
pub fn direct_memif_socket_path(host: &str, master: &str, slave: &str) -> String {
    format!("{}/memif_direct_{}_{}_{}.sock", MEMIF_SOCKET_DIR, host, master, slave)
}

/// Entry builder targeting the host vswitch
#[derive(Debug, Clone, Copy, Default)]
pub struct VswitchEntryBuilder;

impl ConfigEntryBuilder for VswitchEntryBuilder {
    fn cross_connect(&self, host: &str, rx_if: &str, tx_if: &str) -> ConfigEntry {
        build_xconnect_entry(host, rx_if, tx_if)
    }
}
