//! Collaborator interfaces consumed by the L2PP renderer
//!
//! Every external lookup and side effect goes through one of these traits.
//! A [`RenderContext`] bundles them so the renderer carries no hidden
//! process-wide state and tests can swap in fakes.

use std::sync::Arc;

use nsc_cfgmgr_common::RenderResult;

use crate::entries::VswitchEntryBuilder;
use crate::if_state::InterfaceStateCoordinator;
use crate::types::{
    ConfigEntry, Connection, Interface, NetworkService, OverlayDefinition, PlacementRecord,
    ResolvedEndpoint,
};
use crate::vswitch_if::VswitchInterfaceCreator;
use crate::vxlan_mesh::VxlanMeshBuilder;

/// Authoritative record of which host a workload is scheduled on.
pub trait PlacementDirectory: Send + Sync {
    /// Host assigned to `workload`; `None` or an empty name means unplaced.
    fn lookup(&self, workload: &str) -> Option<String>;
}

/// Host lookups.
pub trait HostRegistry: Send + Sync {
    fn exists(&self, host: &str) -> bool;

    fn find_interface(&self, host: &str, interface: &str) -> Option<Interface>;

    /// Interfaces on `host` carrying every label in `labels`.
    fn find_interfaces_by_label(&self, host: &str, labels: &[String]) -> Vec<Interface>;

    /// Underlay address used as a tunnel endpoint on `host`.
    fn underlay_address(&self, host: &str) -> Option<String>;
}

/// Cross-host overlay lookups.
pub trait OverlayRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<OverlayDefinition>;
}

/// Everything the mesh builder needs to stitch one connection across hosts.
#[derive(Debug, Clone, Copy)]
pub struct MeshRequest<'a> {
    pub overlay: &'a OverlayDefinition,
    pub conn: &'a Connection,
    pub conn_index: u32,
    pub endpoints: &'a [ResolvedEndpoint; 2],
    pub placements: &'a [PlacementRecord; 2],
    /// Switch-facing interface created on each endpoint's host
    pub local_interfaces: &'a [String; 2],
}

/// Builds the inter-host tunnels and remote-side cross-connects.
pub trait OverlayMeshBuilder: Send + Sync {
    fn build_mesh(&self, ns: &mut NetworkService, req: MeshRequest<'_>) -> RenderResult<()>;

    /// Free overlay resources held by `service` once it is removed.
    fn release_service(&self, _service: &str) {}
}

/// Switch-facing interface produced for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchInterface {
    pub name: String,
    /// Fast-path id allocated for the switch side, if any
    pub fast_path_id: Option<u32>,
}

/// Delegated interface construction.
pub trait InterfaceCreator: Send + Sync {
    /// Create the switch-facing side of `endpoint` on `host`.
    ///
    /// `hint` is a preferred switch-side interface name; one is generated
    /// when it is absent. Entries are recorded on `ns`.
    fn create_pair(
        &self,
        ns: &mut NetworkService,
        host: &str,
        conn: &Connection,
        endpoint: &ResolvedEndpoint,
        hint: Option<&str>,
    ) -> RenderResult<SwitchInterface>;

    /// Pair two fast-path interfaces on `host` directly, bypassing the switch.
    fn create_direct_pair(
        &self,
        ns: &mut NetworkService,
        host: &str,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> RenderResult<()>;
}

/// Low-level configuration entry construction.
pub trait ConfigEntryBuilder: Send + Sync {
    /// One-directional cross-connect from `rx_if` to `tx_if` on `host`.
    fn cross_connect(&self, host: &str, rx_if: &str, tx_if: &str) -> ConfigEntry;
}

/// Collaborators injected into the renderer.
#[derive(Clone)]
pub struct RenderContext {
    pub placements: Arc<dyn PlacementDirectory>,
    pub hosts: Arc<dyn HostRegistry>,
    pub overlays: Arc<dyn OverlayRegistry>,
    pub mesh_builder: Arc<dyn OverlayMeshBuilder>,
    pub interfaces: Arc<dyn InterfaceCreator>,
    pub entries: Arc<dyn ConfigEntryBuilder>,
    pub if_states: Arc<InterfaceStateCoordinator>,
}

impl RenderContext {
    /// Context wiring the vswitch interface creator, the vxlan mesh builder
    /// and a fresh in-memory interface state store around the given lookups.
    pub fn with_defaults(
        placements: Arc<dyn PlacementDirectory>,
        hosts: Arc<dyn HostRegistry>,
        overlays: Arc<dyn OverlayRegistry>,
    ) -> Self {
        let if_states = Arc::new(InterfaceStateCoordinator::in_memory());
        let entries: Arc<dyn ConfigEntryBuilder> = Arc::new(VswitchEntryBuilder);
        Self {
            mesh_builder: Arc::new(VxlanMeshBuilder::new(hosts.clone(), entries.clone())),
            interfaces: Arc::new(VswitchInterfaceCreator::new(if_states.clone())),
            placements,
            hosts,
            overlays,
            entries,
            if_states,
        }
    }

    /// Replace the mesh builder (builder pattern)
    pub fn with_mesh_builder(mut self, mesh_builder: Arc<dyn OverlayMeshBuilder>) -> Self {
        self.mesh_builder = mesh_builder;
        self
    }

    /// Replace the interface creator (builder pattern)
    pub fn with_interface_creator(mut self, interfaces: Arc<dyn InterfaceCreator>) -> Self {
        self.interfaces = interfaces;
        self
    }
}
