//! Topology snapshot and in-memory collaborators
//!
//! A snapshot file describes hosts, placements, overlays and network
//! services. The registries built from it serve lookups under a shared
//! read lock; the driver swaps in updates between reconciliation passes.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use nsc_cfgmgr_common::{RenderError, RenderResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collaborators::{HostRegistry, OverlayRegistry, PlacementDirectory};
use crate::types::{HostInfo, Interface, NetworkService, OverlayDefinition, PlacementRecord};

/// Placement directory backed by a map
#[derive(Debug, Default)]
pub struct InMemoryPlacementDirectory {
    placements: RwLock<HashMap<String, String>>,
}

impl InMemoryPlacementDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place (or move) a workload on a host
    pub fn place(&self, workload: impl Into<String>, host: impl Into<String>) {
        self.placements.write().insert(workload.into(), host.into());
    }

    pub fn unplace(&self, workload: &str) {
        self.placements.write().remove(workload);
    }

    /// Swap in a new set of placements
    pub fn replace(&self, placements: &[PlacementRecord]) {
        *self.placements.write() = placements
            .iter()
            .map(|p| (p.workload.clone(), p.host.clone()))
            .collect();
    }
}

impl PlacementDirectory for InMemoryPlacementDirectory {
    fn lookup(&self, workload: &str) -> Option<String> {
        self.placements.read().get(workload).cloned()
    }
}

/// Host registry backed by a map
#[derive(Debug, Default)]
pub struct InMemoryHostRegistry {
    hosts: RwLock<HashMap<String, HostInfo>>,
}

impl InMemoryHostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, host: HostInfo) {
        self.hosts.write().insert(host.name.clone(), host);
    }

    /// Swap in a new set of hosts
    pub fn replace(&self, hosts: &[HostInfo]) {
        *self.hosts.write() = hosts.iter().map(|h| (h.name.clone(), h.clone())).collect();
    }
}

impl HostRegistry for InMemoryHostRegistry {
    fn exists(&self, host: &str) -> bool {
        self.hosts.read().contains_key(host)
    }

    fn find_interface(&self, host: &str, interface: &str) -> Option<Interface> {
        self.hosts
            .read()
            .get(host)
            .and_then(|h| h.find_interface(interface))
            .cloned()
    }

    fn find_interfaces_by_label(&self, host: &str, labels: &[String]) -> Vec<Interface> {
        self.hosts
            .read()
            .get(host)
            .map(|h| h.interfaces_with_labels(labels).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    fn underlay_address(&self, host: &str) -> Option<String> {
        self.hosts
            .read()
            .get(host)
            .and_then(|h| h.underlay_address.clone())
    }
}

/// Overlay registry backed by a map
#[derive(Debug, Default)]
pub struct InMemoryOverlayRegistry {
    overlays: RwLock<HashMap<String, OverlayDefinition>>,
}

impl InMemoryOverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, overlay: OverlayDefinition) {
        self.overlays.write().insert(overlay.name.clone(), overlay);
    }

    /// Swap in a new set of overlays
    pub fn replace(&self, overlays: &[OverlayDefinition]) {
        *self.overlays.write() = overlays.iter().map(|o| (o.name.clone(), o.clone())).collect();
    }
}

impl OverlayRegistry for InMemoryOverlayRegistry {
    fn lookup(&self, name: &str) -> Option<OverlayDefinition> {
        self.overlays.read().get(name).cloned()
    }
}

/// Everything the renderer reads, as loaded from a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub hosts: Vec<HostInfo>,
    #[serde(default)]
    pub placements: Vec<PlacementRecord>,
    #[serde(default)]
    pub overlays: Vec<OverlayDefinition>,
    #[serde(default)]
    pub services: Vec<NetworkService>,
}

impl TopologySnapshot {
    pub fn from_toml_str(content: &str) -> RenderResult<Self> {
        toml::from_str(content)
            .map_err(|e| RenderError::config("snapshot", format!("Failed to parse TOML: {}", e)))
    }

    pub fn from_json_str(content: &str) -> RenderResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| RenderError::config("snapshot", format!("Failed to parse JSON: {}", e)))
    }

    /// Load a snapshot, parsing `.json` files as JSON and anything else as TOML
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let snapshot = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        snapshot.validate()?;
        info!(
            "Loaded snapshot {}: {} hosts, {} placements, {} overlays, {} services",
            path.display(),
            snapshot.hosts.len(),
            snapshot.placements.len(),
            snapshot.overlays.len(),
            snapshot.services.len()
        );
        Ok(snapshot)
    }

    /// Reject duplicate names
    pub fn validate(&self) -> RenderResult<()> {
        check_unique("hosts", self.hosts.iter().map(|h| h.name.as_str()))?;
        check_unique("placements", self.placements.iter().map(|p| p.workload.as_str()))?;
        check_unique("overlays", self.overlays.iter().map(|o| o.name.as_str()))?;
        check_unique("services", self.services.iter().map(|s| s.name.as_str()))?;
        Ok(())
    }

    pub fn placement_directory(&self) -> InMemoryPlacementDirectory {
        let dir = InMemoryPlacementDirectory::new();
        dir.replace(&self.placements);
        dir
    }

    pub fn host_registry(&self) -> InMemoryHostRegistry {
        let registry = InMemoryHostRegistry::new();
        registry.replace(&self.hosts);
        registry
    }

    pub fn overlay_registry(&self) -> InMemoryOverlayRegistry {
        let registry = InMemoryOverlayRegistry::new();
        registry.replace(&self.overlays);
        registry
    }

    /// Load hosts, placements and overlays into existing registries
    pub fn apply(
        &self,
        placements: &InMemoryPlacementDirectory,
        hosts: &InMemoryHostRegistry,
        overlays: &InMemoryOverlayRegistry,
    ) {
        placements.replace(&self.placements);
        hosts.replace(&self.hosts);
        overlays.replace(&self.overlays);
    }
}

fn check_unique<'a>(field: &str, names: impl Iterator<Item = &'a str>) -> RenderResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(RenderError::config(field, format!("duplicate name {}", name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InterfaceType, MeshTopology, OverlayTransport};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SNAPSHOT: &str = r#"
[[hosts]]
name = "node1"
underlay_address = "10.0.0.1"

[[hosts.interfaces]]
name = "GigE0/8/0"
if_type = "ethernet"
labels = ["uplink"]

[[hosts]]
name = "node2"
underlay_address = "10.0.0.2"

[[placements]]
workload = "podX"
host = "node1"

[[overlays]]
name = "mesh1"
connection_type = "vxlan"
service_mesh_type = "mesh"
vni_range_start = 5000
vni_range_end = 5999

[[services]]
name = "svcA"

[[services.spec.workloads]]
name = "podX"
interfaces = [{ name = "eth0", if_type = "memif" }]

[[services.spec.connections]]
workload_interfaces = ["podX/eth0"]
host_interface_labels = ["uplink"]
"#;

    #[test]
    fn test_parse_toml_snapshot() {
        let snapshot = TopologySnapshot::from_toml_str(SNAPSHOT).unwrap();
        snapshot.validate().unwrap();

        assert_eq!(snapshot.hosts.len(), 2);
        assert_eq!(snapshot.hosts[0].interfaces[0].if_type, InterfaceType::Ethernet);
        assert_eq!(snapshot.overlays[0].connection_type, OverlayTransport::Vxlan);
        assert_eq!(snapshot.overlays[0].service_mesh_type, MeshTopology::Mesh);

        let svc = &snapshot.services[0];
        assert_eq!(svc.spec.connections[0].host_interface_labels, vec!["uplink"]);
        assert!(svc.status.msgs.is_empty());
    }

    #[test]
    fn test_registries_from_snapshot() {
        let snapshot = TopologySnapshot::from_toml_str(SNAPSHOT).unwrap();

        let placements = snapshot.placement_directory();
        assert_eq!(placements.lookup("podX"), Some("node1".to_string()));
        assert_eq!(placements.lookup("podY"), None);

        let hosts = snapshot.host_registry();
        assert!(hosts.exists("node2"));
        assert!(!hosts.exists("node3"));
        assert!(hosts.find_interface("node1", "GigE0/8/0").is_some());
        assert_eq!(
            hosts.find_interfaces_by_label("node1", &["uplink".to_string()]).len(),
            1
        );
        assert!(hosts.find_interfaces_by_label("node3", &["uplink".to_string()]).is_empty());
        assert_eq!(hosts.underlay_address("node2"), Some("10.0.0.2".to_string()));

        let overlays = snapshot.overlay_registry();
        assert!(overlays.lookup("mesh1").is_some());
        assert!(overlays.lookup("mesh2").is_none());
    }

    #[test]
    fn test_duplicate_hosts_rejected() {
        let snapshot = TopologySnapshot {
            hosts: vec![HostInfo::new("node1"), HostInfo::new("node1")],
            ..Default::default()
        };
        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate name node1"));
    }

    #[test]
    fn test_load_json_snapshot() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"hosts": [{{"name": "node1"}}], "placements": [{{"workload": "podX", "host": "node1"}}]}}"#
        )
        .unwrap();

        let snapshot = TopologySnapshot::load(file.path()).unwrap();
        assert_eq!(snapshot.placements[0], PlacementRecord::new("podX", "node1"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = TopologySnapshot::load("/nonexistent/snapshot.toml").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn test_placement_updates() {
        let dir = InMemoryPlacementDirectory::new();
        dir.place("podX", "node1");
        dir.place("podX", "node2");
        assert_eq!(dir.lookup("podX"), Some("node2".to_string()));
        dir.unplace("podX");
        assert_eq!(dir.lookup("podX"), None);
    }

    #[test]
    fn test_apply_replaces_registry_contents() {
        let snapshot = TopologySnapshot::from_toml_str(SNAPSHOT).unwrap();
        let placements = InMemoryPlacementDirectory::new();
        placements.place("podGone", "node1");
        let hosts = InMemoryHostRegistry::new();
        hosts.insert(HostInfo::new("node9"));
        let overlays = InMemoryOverlayRegistry::new();

        snapshot.apply(&placements, &hosts, &overlays);
        assert_eq!(placements.lookup("podGone"), None);
        assert_eq!(placements.lookup("podX"), Some("node1".to_string()));
        assert!(!hosts.exists("node9"));
        assert!(hosts.exists("node1"));
        assert!(overlays.lookup("mesh1").is_some());
    }
}
