//! Shared fixtures and recording collaborators for l2ppmgrd integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nsc_cfgmgr_common::RenderResult;
use nsc_l2ppmgrd::collaborators::{InterfaceCreator, MeshRequest, OverlayMeshBuilder, SwitchInterface};
use nsc_l2ppmgrd::topology::{InMemoryHostRegistry, InMemoryOverlayRegistry, InMemoryPlacementDirectory};
use nsc_l2ppmgrd::types::{
    Connection, HostInfo, Interface, InterfaceType, MeshTopology, NetworkService,
    OverlayDefinition, OverlayTransport, ResolvedEndpoint, Workload,
};
use nsc_l2ppmgrd::vswitch_if::VswitchInterfaceCreator;
use nsc_l2ppmgrd::{InterfaceStateCoordinator, L2ppMgr, RenderContext};
use parking_lot::Mutex;

/// One recorded mesh builder invocation
#[derive(Debug, Clone)]
pub struct MeshCall {
    pub service: String,
    pub overlay: String,
    pub conn_index: u32,
    pub local_interfaces: [String; 2],
}

/// Mesh builder that records every request and builds nothing
#[derive(Default)]
pub struct RecordingMeshBuilder {
    calls: Mutex<Vec<MeshCall>>,
}

impl RecordingMeshBuilder {
    pub fn calls(&self) -> Vec<MeshCall> {
        self.calls.lock().clone()
    }
}

impl OverlayMeshBuilder for RecordingMeshBuilder {
    fn build_mesh(&self, ns: &mut NetworkService, req: MeshRequest<'_>) -> RenderResult<()> {
        self.calls.lock().push(MeshCall {
            service: ns.name.clone(),
            overlay: req.overlay.name.clone(),
            conn_index: req.conn_index,
            local_interfaces: req.local_interfaces.clone(),
        });
        Ok(())
    }
}

/// Interface creator that counts calls before delegating to the vswitch creator
pub struct CountingInterfaceCreator {
    inner: VswitchInterfaceCreator,
    pairs: AtomicUsize,
    direct_pairs: AtomicUsize,
}

impl CountingInterfaceCreator {
    pub fn new(if_states: Arc<InterfaceStateCoordinator>) -> Self {
        Self {
            inner: VswitchInterfaceCreator::new(if_states),
            pairs: AtomicUsize::new(0),
            direct_pairs: AtomicUsize::new(0),
        }
    }

    pub fn pairs(&self) -> usize {
        self.pairs.load(Ordering::SeqCst)
    }

    pub fn direct_pairs(&self) -> usize {
        self.direct_pairs.load(Ordering::SeqCst)
    }
}

impl InterfaceCreator for CountingInterfaceCreator {
    fn create_pair(
        &self,
        ns: &mut NetworkService,
        host: &str,
        conn: &Connection,
        endpoint: &ResolvedEndpoint,
        hint: Option<&str>,
    ) -> RenderResult<SwitchInterface> {
        self.pairs.fetch_add(1, Ordering::SeqCst);
        self.inner.create_pair(ns, host, conn, endpoint, hint)
    }

    fn create_direct_pair(
        &self,
        ns: &mut NetworkService,
        host: &str,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> RenderResult<()> {
        self.direct_pairs.fetch_add(1, Ordering::SeqCst);
        self.inner.create_direct_pair(ns, host, endpoints)
    }
}

/// Two hosts, three placed workloads and two overlays
///
/// - node1: podX, podY, host interfaces GigE0/8/0 (label uplink) and
///   GigE0/9/0, GigE0/a/0 (both label trunk)
/// - node2: podZ
/// - mesh1: vxlan full mesh, hub1: vxlan hub-and-spoke
pub struct TestEnv {
    pub placements: Arc<InMemoryPlacementDirectory>,
    pub hosts: Arc<InMemoryHostRegistry>,
    pub overlays: Arc<InMemoryOverlayRegistry>,
    pub mesh: Arc<RecordingMeshBuilder>,
    pub creator: Arc<CountingInterfaceCreator>,
    pub mgr: L2ppMgr,
}

impl TestEnv {
    pub fn new() -> Self {
        let placements = Arc::new(InMemoryPlacementDirectory::new());
        placements.place("podX", "node1");
        placements.place("podY", "node1");
        placements.place("podZ", "node2");

        let hosts = Arc::new(InMemoryHostRegistry::new());
        hosts.insert(
            HostInfo::new("node1")
                .with_underlay_address("10.0.0.1")
                .with_interface(Interface::new("GigE0/8/0", InterfaceType::Ethernet).with_label("uplink"))
                .with_interface(Interface::new("GigE0/9/0", InterfaceType::Ethernet).with_label("trunk"))
                .with_interface(Interface::new("GigE0/a/0", InterfaceType::Ethernet).with_label("trunk")),
        );
        hosts.insert(HostInfo::new("node2").with_underlay_address("10.0.0.2"));

        let overlays = Arc::new(InMemoryOverlayRegistry::new());
        overlays.insert(
            OverlayDefinition::new("mesh1", OverlayTransport::Vxlan, MeshTopology::Mesh)
                .with_vni_range(5000, 5999),
        );
        overlays.insert(OverlayDefinition::new(
            "hub1",
            OverlayTransport::Vxlan,
            MeshTopology::HubAndSpoke,
        ));

        let mesh = Arc::new(RecordingMeshBuilder::default());
        let ctx = RenderContext::with_defaults(placements.clone(), hosts.clone(), overlays.clone())
            .with_mesh_builder(mesh.clone());
        let creator = Arc::new(CountingInterfaceCreator::new(ctx.if_states.clone()));
        let ctx = ctx.with_interface_creator(creator.clone());

        Self {
            placements,
            hosts,
            overlays,
            mesh,
            creator,
            mgr: L2ppMgr::new(ctx),
        }
    }

    pub fn if_states(&self) -> &Arc<InterfaceStateCoordinator> {
        &self.mgr.ctx().if_states
    }
}

/// A workload with eth0 and eth1 of the given type
pub fn workload(name: &str, if_type: InterfaceType) -> Workload {
    Workload::new(name)
        .with_interface(Interface::new("eth0", if_type))
        .with_interface(Interface::new("eth1", if_type))
}

/// Service `svcA` declaring podX, podY and podZ with interfaces of `if_type`
pub fn service(if_type: InterfaceType) -> NetworkService {
    NetworkService::new("svcA")
        .with_workload(workload("podX", if_type))
        .with_workload(workload("podY", if_type))
        .with_workload(workload("podZ", if_type))
}

/// Connection between two workload interfaces
pub fn pod_conn(a: (&str, &str), b: (&str, &str)) -> Connection {
    Connection::l2pp()
        .with_workload_interface(a.0, a.1)
        .with_workload_interface(b.0, b.1)
}
