//! Name constants for l2ppmgrd

/// Connection method values
pub mod conn_method {
    /// Pair fast-path interfaces directly when possible (default).
    pub const DIRECT: &str = "direct";
    /// Always drop both sides into the vswitch and cross-connect them.
    pub const VSWITCH: &str = "vswitch";
}

/// Interface type names
pub mod if_type {
    pub const MEMIF: &str = "memif";
    pub const VETH: &str = "veth";
    pub const TAP: &str = "tap";
    pub const ETHERNET: &str = "ethernet";
    pub const AF_PACKET: &str = "afpacket";
    pub const VXLAN_TUNNEL: &str = "vxlan_tunnel";
}

/// Overlay connection transports and service-mesh topologies
pub mod overlay {
    pub const TRANSPORT_VXLAN: &str = "vxlan";
    pub const TOPOLOGY_MESH: &str = "mesh";
    pub const TOPOLOGY_HUB_AND_SPOKE: &str = "hub_and_spoke";
}

/// Connection type names
pub mod conn_type {
    pub const L2PP: &str = "l2pp";
    pub const L2MP: &str = "l2mp";
}

/// Rendered entry kinds, used as the middle segment of entry keys
pub mod entry_kind {
    pub const INTERFACE: &str = "interface";
    pub const XCONNECT: &str = "xconnect";
}

/// Generated interface name prefixes on the vswitch side
pub mod if_prefix {
    pub const MEMIF_VSWITCH: &str = "IF_MEMIF_VSWITCH";
    pub const VETH_VSWITCH: &str = "IF_VETH_VSWITCH";
    pub const AFPIF_VSWITCH: &str = "IF_AFPIF_VSWITCH";
    pub const TAP_VSWITCH: &str = "IF_TAP_VSWITCH";
    pub const VXLAN: &str = "IF_VXLAN_L2PP";
}

/// Interface entry fields
pub mod if_fields {
    pub const TYPE: &str = "type";
    pub const ENABLED: &str = "enabled";
    pub const MTU: &str = "mtu";
    pub const MEMIF_ID: &str = "memif_id";
    pub const MEMIF_MASTER: &str = "memif_master";
    pub const MEMIF_SOCKET: &str = "memif_socket";
    pub const HOST_IF_NAME: &str = "host_if_name";
    pub const PEER_IF_NAME: &str = "peer_if_name";
    pub const VXLAN_SRC: &str = "vxlan_src_address";
    pub const VXLAN_DST: &str = "vxlan_dst_address";
    pub const VXLAN_VNI: &str = "vxlan_vni";
}

/// Cross-connect entry fields
pub mod xconnect_fields {
    pub const RX_INTERFACE: &str = "receive_interface";
    pub const TX_INTERFACE: &str = "transmit_interface";
}

/// Directory holding memif sockets
pub const MEMIF_SOCKET_DIR: &str = "/var/run/nsc";
