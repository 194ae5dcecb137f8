//! L2PP Manager - connection rendering entry points
//!
//! [`L2ppMgr::render_connection`] runs one connection through resolution,
//! classification and the matching renderer. [`L2ppMgr::render_service`]
//! re-renders a whole service from scratch, isolating each connection's
//! failure from its siblings.

use nsc_cfgmgr_common::{RenderError, RenderResult};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::classifier::{classify, Topology};
use crate::collaborators::RenderContext;
use crate::cross_host::CrossHostRenderer;
use crate::resolver::EndpointResolver;
use crate::same_host::SameHostRenderer;
use crate::types::{Connection, ConnectionType, NetworkService};

/// Outcome of rendering every connection of one service
#[derive(Debug, Default)]
pub struct ServiceRenderReport {
    pub service: String,
    /// Indices of connections that rendered
    pub rendered: Vec<u32>,
    /// Indices of connections that failed, with their errors
    pub failed: Vec<(u32, RenderError)>,
}

impl ServiceRenderReport {
    /// Returns true if every connection rendered
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> ServiceRenderSummary {
        ServiceRenderSummary {
            service: self.service.clone(),
            rendered: self.rendered.clone(),
            failed: self.failed.iter().map(|(i, _)| *i).collect(),
        }
    }
}

/// Serializable digest of a [`ServiceRenderReport`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceRenderSummary {
    pub service: String,
    pub rendered: Vec<u32>,
    pub failed: Vec<u32>,
}

/// L2PP connection renderer
pub struct L2ppMgr {
    ctx: RenderContext,
}

impl L2ppMgr {
    pub fn new(ctx: RenderContext) -> Self {
        info!("L2ppMgr initialized");
        Self { ctx }
    }

    pub fn ctx(&self) -> &RenderContext {
        &self.ctx
    }

    /// Render connection `conn_index` of `ns`
    ///
    /// Entries are recorded on the service status keyed by entry key, so
    /// rendering again with unchanged inputs leaves the entry set as is.
    /// Failures are appended to the service status and returned.
    #[instrument(skip(self, ns, conn), fields(service = %ns.name))]
    pub fn render_connection(
        &self,
        ns: &mut NetworkService,
        conn: &Connection,
        conn_index: u32,
    ) -> RenderResult<()> {
        if conn.conn_type != ConnectionType::L2pp {
            return Err(ns.record_error(RenderError::UnsupportedConnectionType {
                service: ns.name.clone(),
                conn_index,
                conn_type: conn.conn_type.as_str().to_string(),
            }));
        }

        let resolution = EndpointResolver::new(self.ctx.placements.as_ref(), self.ctx.hosts.as_ref())
            .resolve(ns, conn)?;
        let endpoints = &resolution.endpoints;

        match classify(ns, conn, endpoints, resolution.static_host, self.ctx.overlays.as_ref())? {
            Topology::SameHost(host) => {
                SameHostRenderer::new(&self.ctx).render(ns, &host, conn, endpoints)
            }
            Topology::CrossHost(overlay) => CrossHostRenderer::new(&self.ctx).render(
                ns,
                conn,
                conn_index,
                endpoints,
                &overlay,
                &resolution.placements,
            ),
        }
    }

    /// Re-render every connection of `ns`
    ///
    /// Status messages and all entries owned by the service are dropped
    /// first, so the resulting status reflects only this pass.
    #[instrument(skip(self, ns), fields(service = %ns.name))]
    pub fn render_service(&self, ns: &mut NetworkService) -> ServiceRenderReport {
        let owner = ns.owner_key();
        ns.status.msgs.clear();
        let removed = ns.status.remove_entries_owned_by(&owner);
        debug!("cleared {} entries owned by {}", removed, owner);

        let mut report = ServiceRenderReport {
            service: ns.name.clone(),
            ..Default::default()
        };
        let connections = ns.spec.connections.clone();
        for (conn_index, conn) in (0u32..).zip(connections.iter()) {
            match self.render_connection(ns, conn, conn_index) {
                Ok(()) => report.rendered.push(conn_index),
                Err(e) => {
                    if e.is_fatal_connection() {
                        debug!("connection {} of {} skipped: {}", conn_index, ns.name, e);
                    } else {
                        error!("connection {} of {} hit a non-connection error: {}", conn_index, ns.name, e);
                    }
                    report.failed.push((conn_index, e));
                }
            }
        }

        info!(
            "rendered {}/{} connections of {}, {} entries",
            report.rendered.len(),
            connections.len(),
            ns.name,
            ns.status.rendered_entries.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{InMemoryHostRegistry, InMemoryOverlayRegistry, InMemoryPlacementDirectory};
    use crate::types::{
        ConnMethod, HostInfo, Interface, InterfaceType, MeshTopology, OverlayDefinition,
        OverlayTransport, Workload,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn manager() -> L2ppMgr {
        let placements = InMemoryPlacementDirectory::new();
        placements.place("podX", "node1");
        placements.place("podY", "node1");
        placements.place("podZ", "node2");

        let hosts = InMemoryHostRegistry::new();
        hosts.insert(
            HostInfo::new("node1")
                .with_underlay_address("10.0.0.1")
                .with_interface(Interface::new("GigE0/8/0", InterfaceType::Ethernet).with_label("uplink")),
        );
        hosts.insert(HostInfo::new("node2").with_underlay_address("10.0.0.2"));

        let overlays = InMemoryOverlayRegistry::new();
        overlays.insert(
            OverlayDefinition::new("mesh1", OverlayTransport::Vxlan, MeshTopology::Mesh)
                .with_vni_range(5000, 5999),
        );

        L2ppMgr::new(RenderContext::with_defaults(
            Arc::new(placements),
            Arc::new(hosts),
            Arc::new(overlays),
        ))
    }

    fn service() -> NetworkService {
        let pod = |name: &str| {
            Workload::new(name)
                .with_interface(Interface::new("eth0", InterfaceType::Memif))
                .with_interface(Interface::new("eth1", InterfaceType::Veth))
        };
        NetworkService::new("svcA")
            .with_workload(pod("podX"))
            .with_workload(pod("podY"))
            .with_workload(pod("podZ"))
    }

    #[test]
    fn test_render_connection_same_host_switch() {
        let mgr = manager();
        let mut ns = service();
        let conn = Connection::l2pp()
            .with_workload_interface("podX", "eth1")
            .with_workload_interface("podY", "eth1");

        mgr.render_connection(&mut ns, &conn, 0).unwrap();
        let xconnects = ns
            .status
            .entries_owned_by("NetworkService/svcA")
            .filter(|e| e.kind == "xconnect")
            .count();
        assert_eq!(xconnects, 2);
    }

    #[test]
    fn test_render_connection_cross_host() {
        let mgr = manager();
        let mut ns = service();
        let conn = Connection::l2pp()
            .with_workload_interface("podX", "eth0")
            .with_workload_interface("podZ", "eth0")
            .with_overlay("mesh1");

        mgr.render_connection(&mut ns, &conn, 2).unwrap();
        assert!(ns.status.rendered_entries.contains_key("node1/interface/IF_VXLAN_L2PP_5000"));
        assert!(ns.status.rendered_entries.contains_key("node2/interface/IF_VXLAN_L2PP_5000"));
    }

    #[test]
    fn test_render_connection_static_host_mismatch_never_tunnels() {
        let mgr = manager();
        let mut ns = service();
        let conn = Connection::l2pp()
            .with_workload_interface("podZ", "eth0")
            .with_host_interface("node1", "GigE0/8/0")
            .with_overlay("mesh1");

        let err = mgr.render_connection(&mut ns, &conn, 0).unwrap_err();
        assert!(matches!(err, RenderError::HostMismatch { .. }));
        assert!(ns.status.rendered_entries.is_empty());
    }

    #[test]
    fn test_l2mp_connection_rejected() {
        let mgr = manager();
        let mut ns = service();
        let mut conn = Connection::l2pp()
            .with_workload_interface("podX", "eth0")
            .with_workload_interface("podY", "eth0");
        conn.conn_type = ConnectionType::L2mp;

        let err = mgr.render_connection(&mut ns, &conn, 4).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedConnectionType { conn_index: 4, .. }));
        assert_eq!(ns.status.msgs.len(), 1);
    }

    #[test]
    fn test_render_connection_is_idempotent() {
        let mgr = manager();
        let mut ns = service();
        let conn = Connection::l2pp()
            .with_workload_interface("podX", "eth0")
            .with_workload_interface("podY", "eth0");

        mgr.render_connection(&mut ns, &conn, 0).unwrap();
        let first = ns.status.rendered_entries.clone();
        mgr.render_connection(&mut ns, &conn, 0).unwrap();
        assert_eq!(ns.status.rendered_entries, first);
    }

    #[test]
    fn test_render_service_isolates_failures() {
        let mgr = manager();
        let mut ns = service()
            .with_connection(
                Connection::l2pp()
                    .with_workload_interface("podX", "eth0")
                    .with_workload_interface("podW", "eth0"),
            )
            .with_connection(
                Connection::l2pp()
                    .with_workload_interface("podX", "eth1")
                    .with_workload_interface("podY", "eth1")
                    .with_conn_method(ConnMethod::Vswitch),
            );

        let report = mgr.render_service(&mut ns);
        assert_eq!(report.rendered, vec![1]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0], (0, RenderError::PlacementIncomplete { .. })));
        assert!(!report.is_clean());
        assert_eq!(report.summary().failed, vec![0]);
        assert!(ns.status.rendered_entries.contains_key("node1/xconnect/IF_AFPIF_VSWITCH_podX_eth1"));
    }

    #[test]
    fn test_render_service_replaces_previous_pass() {
        let mgr = manager();
        let mut ns = service().with_connection(
            Connection::l2pp()
                .with_workload_interface("podX", "eth0")
                .with_workload_interface("podW", "eth0"),
        );

        mgr.render_service(&mut ns);
        let msgs = ns.status.msgs.clone();
        assert_eq!(msgs.len(), 2);

        // the same failure is reported once per pass, not accumulated
        mgr.render_service(&mut ns);
        assert_eq!(ns.status.msgs, msgs);

        // entries from a connection that no longer exists are dropped
        ns.spec.connections = vec![Connection::l2pp()
            .with_workload_interface("podX", "eth0")
            .with_workload_interface("podX", "eth1")];
        let report = mgr.render_service(&mut ns);
        assert!(report.is_clean());
        assert!(ns.status.msgs.is_empty());
        assert_eq!(ns.status.rendered_entries.len(), 2);
    }
}
