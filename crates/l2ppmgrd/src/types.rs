//! Type definitions for l2ppmgrd

use nsc_cfgmgr_common::{FieldValues, ModelType, RenderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::tables::{conn_method, conn_type, if_type, overlay};

/// Both directions of a two-endpoint pairing, as (local, remote) indices.
pub const PAIR_DIRECTIONS: [(usize, usize); 2] = [(0, 1), (1, 0)];

/// Interface type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    /// Shared-memory interface, capable of direct fast-path pairing
    Memif,
    /// Linux veth pair
    Veth,
    /// Tap interface
    Tap,
    /// Physical host interface
    Ethernet,
}

impl InterfaceType {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::Memif => if_type::MEMIF,
            InterfaceType::Veth => if_type::VETH,
            InterfaceType::Tap => if_type::TAP,
            InterfaceType::Ethernet => if_type::ETHERNET,
        }
    }

    /// Returns true if two interfaces of this type can be paired directly
    pub fn is_fast_path(&self) -> bool {
        matches!(self, InterfaceType::Memif)
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interface declared on a workload or a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub if_type: InterfaceType,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
}

impl Interface {
    pub fn new(name: impl Into<String>, if_type: InterfaceType) -> Self {
        Self {
            name: name.into(),
            if_type,
            labels: Vec::new(),
            mtu: None,
        }
    }

    /// Add a label (builder pattern)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Set the MTU (builder pattern)
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Returns true if the interface carries every label in `labels`
    pub fn has_labels(&self, labels: &[String]) -> bool {
        labels.iter().all(|l| self.labels.contains(l))
    }
}

/// Whether an endpoint's parent is a workload or a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentType {
    Workload,
    Host,
}

/// Reference to `parent/interface`, where parent is a workload or a host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointRef {
    pub parent: String,
    pub interface: String,
}

impl EndpointRef {
    pub fn new(parent: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            interface: interface.into(),
        }
    }
}

impl FromStr for EndpointRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((parent, interface)) if !parent.is_empty() && !interface.is_empty() => {
                Ok(Self::new(parent, interface))
            }
            _ => Err(format!("Invalid endpoint reference: {}", s)),
        }
    }
}

impl TryFrom<String> for EndpointRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EndpointRef> for String {
    fn from(r: EndpointRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.interface)
    }
}

/// Realization method hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnMethod {
    #[default]
    Direct,
    Vswitch,
}

impl ConnMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnMethod::Direct => conn_method::DIRECT,
            ConnMethod::Vswitch => conn_method::VSWITCH,
        }
    }
}

/// Connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    L2pp,
    L2mp,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::L2pp => conn_type::L2PP,
            ConnectionType::L2mp => conn_type::L2MP,
        }
    }
}

/// One declared link inside a network service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub conn_type: ConnectionType,
    #[serde(default)]
    pub workload_interfaces: Vec<EndpointRef>,
    #[serde(default)]
    pub host_interfaces: Vec<EndpointRef>,
    #[serde(default)]
    pub host_interface_labels: Vec<String>,
    #[serde(default)]
    pub overlay: Option<String>,
    #[serde(default)]
    pub conn_method: Option<ConnMethod>,
}

impl Connection {
    /// Create an empty L2PP connection
    pub fn l2pp() -> Self {
        Self::default()
    }

    pub fn with_workload_interface(mut self, parent: &str, interface: &str) -> Self {
        self.workload_interfaces.push(EndpointRef::new(parent, interface));
        self
    }

    pub fn with_host_interface(mut self, host: &str, interface: &str) -> Self {
        self.host_interfaces.push(EndpointRef::new(host, interface));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.host_interface_labels.push(label.into());
        self
    }

    pub fn with_overlay(mut self, overlay: impl Into<String>) -> Self {
        self.overlay = Some(overlay.into());
        self
    }

    pub fn with_conn_method(mut self, method: ConnMethod) -> Self {
        self.conn_method = Some(method);
        self
    }

    /// The realization method, with an absent hint meaning direct
    pub fn effective_conn_method(&self) -> ConnMethod {
        self.conn_method.unwrap_or_default()
    }

    /// Number of endpoint references declared before label expansion
    pub fn declared_endpoints(&self) -> usize {
        self.workload_interfaces.len() + self.host_interfaces.len()
    }
}

/// A workload and its declared interfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Workload {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn find_interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// Declarative part of a network service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkServiceSpec {
    #[serde(default)]
    pub workloads: Vec<Workload>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// A one-directional configuration entry for a vswitch or workload agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique entry key: `<agent>/<kind>/<name>`
    pub key: String,
    /// Host or workload agent that applies the entry
    pub agent: String,
    /// Entry kind (interface, xconnect)
    pub kind: String,
    pub fields: FieldValues,
}

/// An emitted entry and the model object that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEntry {
    pub owner: String,
    pub entry: ConfigEntry,
}

/// Rendered configuration and diagnostics of a network service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Rendered entries keyed by entry key
    #[serde(default)]
    pub rendered_entries: BTreeMap<String, RenderedEntry>,
    /// Accumulated human-readable messages
    #[serde(default)]
    pub msgs: Vec<String>,
}

impl ServiceStatus {
    /// Append a diagnostic message
    pub fn append_msg(&mut self, msg: impl Into<String>) {
        self.msgs.push(msg.into());
    }

    /// Record entries under `owner`; an entry with an existing key replaces it
    pub fn add_rendered_entries(
        &mut self,
        owner: &str,
        entries: impl IntoIterator<Item = ConfigEntry>,
    ) {
        for entry in entries {
            self.rendered_entries.insert(
                entry.key.clone(),
                RenderedEntry {
                    owner: owner.to_string(),
                    entry,
                },
            );
        }
    }

    /// Remove every entry owned by `owner`, returning how many were removed
    pub fn remove_entries_owned_by(&mut self, owner: &str) -> usize {
        let before = self.rendered_entries.len();
        self.rendered_entries.retain(|_, e| e.owner != owner);
        before - self.rendered_entries.len()
    }

    /// Entries owned by `owner`, in key order
    pub fn entries_owned_by<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a ConfigEntry> {
        self.rendered_entries
            .values()
            .filter(move |e| e.owner == owner)
            .map(|e| &e.entry)
    }
}

/// A named declarative network service plus its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkService {
    pub name: String,
    #[serde(default)]
    pub spec: NetworkServiceSpec,
    #[serde(default, skip_deserializing)]
    pub status: ServiceStatus,
}

impl NetworkService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: NetworkServiceSpec::default(),
            status: ServiceStatus::default(),
        }
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.spec.workloads.push(workload);
        self
    }

    pub fn with_connection(mut self, conn: Connection) -> Self {
        self.spec.connections.push(conn);
        self
    }

    /// Owner key of entries rendered for this service
    pub fn owner_key(&self) -> String {
        ModelType::NetworkService.key(&self.name)
    }

    pub fn find_workload_interface(&self, workload: &str, interface: &str) -> Option<&Interface> {
        self.spec
            .workloads
            .iter()
            .find(|w| w.name == workload)
            .and_then(|w| w.find_interface(interface))
    }

    /// Append a status message
    pub fn append_status_msg(&mut self, msg: impl Into<String>) {
        self.status.append_msg(msg);
    }

    /// Record a connection failure on the status and hand the error back
    pub fn record_error(&mut self, err: RenderError) -> RenderError {
        warn!("{}", err);
        self.status.append_msg(err.to_string());
        err
    }

    /// Record entries owned by this service
    pub fn add_rendered_entries(&mut self, entries: impl IntoIterator<Item = ConfigEntry>) {
        let owner = self.owner_key();
        self.status.add_rendered_entries(&owner, entries);
    }
}

/// Workload to host assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub workload: String,
    pub host: String,
}

impl PlacementRecord {
    pub fn new(workload: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            workload: workload.into(),
            host: host.into(),
        }
    }
}

/// Concrete binding of one connection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub host: String,
    pub interface: Interface,
    /// Owning workload or host name
    pub parent: String,
    pub parent_type: ParentType,
}

impl ResolvedEndpoint {
    pub fn name(&self) -> &str {
        &self.interface.name
    }

    pub fn if_type(&self) -> InterfaceType {
        self.interface.if_type
    }

    /// Key of this interface's runtime state
    pub fn state_key(&self) -> String {
        format!("{}/{}", self.parent, self.interface.name)
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.interface.name)
    }
}

/// A host with a virtual switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    /// Underlay address used as a tunnel endpoint
    #[serde(default)]
    pub underlay_address: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl HostInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            underlay_address: None,
            interfaces: Vec::new(),
        }
    }

    pub fn with_underlay_address(mut self, address: impl Into<String>) -> Self {
        self.underlay_address = Some(address.into());
        self
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn find_interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn interfaces_with_labels(&self, labels: &[String]) -> Vec<&Interface> {
        self.interfaces.iter().filter(|i| i.has_labels(labels)).collect()
    }
}

/// Overlay connection transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OverlayTransport {
    Vxlan,
    Other(String),
}

impl From<String> for OverlayTransport {
    fn from(s: String) -> Self {
        match s.as_str() {
            overlay::TRANSPORT_VXLAN => OverlayTransport::Vxlan,
            _ => OverlayTransport::Other(s),
        }
    }
}

impl From<OverlayTransport> for String {
    fn from(t: OverlayTransport) -> Self {
        t.to_string()
    }
}

impl fmt::Display for OverlayTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayTransport::Vxlan => f.write_str(overlay::TRANSPORT_VXLAN),
            OverlayTransport::Other(s) => f.write_str(s),
        }
    }
}

/// Overlay service-mesh topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeshTopology {
    Mesh,
    HubAndSpoke,
    Other(String),
}

impl From<String> for MeshTopology {
    fn from(s: String) -> Self {
        match s.as_str() {
            overlay::TOPOLOGY_MESH => MeshTopology::Mesh,
            overlay::TOPOLOGY_HUB_AND_SPOKE => MeshTopology::HubAndSpoke,
            _ => MeshTopology::Other(s),
        }
    }
}

impl From<MeshTopology> for String {
    fn from(t: MeshTopology) -> Self {
        t.to_string()
    }
}

impl fmt::Display for MeshTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshTopology::Mesh => f.write_str(overlay::TOPOLOGY_MESH),
            MeshTopology::HubAndSpoke => f.write_str(overlay::TOPOLOGY_HUB_AND_SPOKE),
            MeshTopology::Other(s) => f.write_str(s),
        }
    }
}

/// A named cross-host overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayDefinition {
    pub name: String,
    pub connection_type: OverlayTransport,
    pub service_mesh_type: MeshTopology,
    #[serde(default)]
    pub vni_range_start: u32,
    #[serde(default)]
    pub vni_range_end: u32,
}

impl OverlayDefinition {
    pub fn new(
        name: impl Into<String>,
        connection_type: OverlayTransport,
        service_mesh_type: MeshTopology,
    ) -> Self {
        Self {
            name: name.into(),
            connection_type,
            service_mesh_type,
            vni_range_start: 0,
            vni_range_end: 0,
        }
    }

    /// Set the VNI range (builder pattern)
    pub fn with_vni_range(mut self, start: u32, end: u32) -> Self {
        self.vni_range_start = start;
        self.vni_range_end = end;
        self
    }
}
