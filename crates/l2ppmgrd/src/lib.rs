//! L2PP Manager Daemon - point-to-point layer-2 connection renderer
//!
//! l2ppmgrd turns declarative network-service connections into vswitch
//! configuration entries, handling:
//! - Endpoint resolution against workload placement and host registries
//! - Same-host loopback, direct memif pairing and vswitch cross-connects
//! - Cross-host connections stitched through a vxlan overlay mesh
//! - Fast-path id bookkeeping across rendering strategies
//! - Concurrent reconciliation of many network services

pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod cross_host;
pub mod entries;
pub mod if_state;
pub mod l2pp_mgr;
pub mod reconciler;
pub mod resolver;
pub mod same_host;
pub mod tables;
pub mod topology;
pub mod types;
pub mod vswitch_if;
pub mod vxlan_mesh;

pub use classifier::{classify, Topology};
pub use collaborators::{
    ConfigEntryBuilder, HostRegistry, InterfaceCreator, MeshRequest, OverlayMeshBuilder,
    OverlayRegistry, PlacementDirectory, RenderContext, SwitchInterface,
};
pub use config::L2ppMgrConfig;
pub use if_state::{
    InMemoryInterfaceStateStore, InterfaceRuntimeState, InterfaceStateCoordinator,
    InterfaceStateStore,
};
pub use l2pp_mgr::{L2ppMgr, ServiceRenderReport, ServiceRenderSummary};
pub use reconciler::Reconciler;
pub use resolver::{EndpointResolver, Resolution};
pub use topology::TopologySnapshot;
pub use types::{Connection, NetworkService, ResolvedEndpoint};
