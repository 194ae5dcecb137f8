//! Cross-host rendering
//!
//! Builds the local half of the connection on each endpoint's host, then
//! hands the inter-host stitching to the overlay's mesh builder. Local
//! halves are left in place when the overlay turns out to be unusable.

use nsc_cfgmgr_common::{RenderError, RenderResult};
use tracing::{debug, info, instrument};

use crate::collaborators::{MeshRequest, RenderContext};
use crate::types::{
    Connection, MeshTopology, NetworkService, OverlayDefinition, OverlayTransport,
    PlacementRecord, ResolvedEndpoint,
};

/// Renders connections whose endpoints sit on different hosts
pub struct CrossHostRenderer<'a> {
    ctx: &'a RenderContext,
}

impl<'a> CrossHostRenderer<'a> {
    pub fn new(ctx: &'a RenderContext) -> Self {
        Self { ctx }
    }

    #[instrument(
        skip(self, ns, conn, endpoints, overlay, placements),
        fields(service = %ns.name, overlay = %overlay.name)
    )]
    pub fn render(
        &self,
        ns: &mut NetworkService,
        conn: &Connection,
        conn_index: u32,
        endpoints: &[ResolvedEndpoint; 2],
        overlay: &OverlayDefinition,
        placements: &[PlacementRecord; 2],
    ) -> RenderResult<()> {
        let mut local_interfaces: [String; 2] = Default::default();
        for ((name, endpoint), placement) in local_interfaces.iter_mut().zip(endpoints).zip(placements) {
            let created = self
                .ctx
                .interfaces
                .create_pair(ns, &placement.host, conn, endpoint, None)
                .map_err(|e| ns.record_error(e))?;
            debug!("{} attached to the vswitch on {} as {}", endpoint, placement.host, created.name);
            *name = created.name;
        }

        match (&overlay.connection_type, &overlay.service_mesh_type) {
            (OverlayTransport::Vxlan, MeshTopology::Mesh) => {
                let req = MeshRequest {
                    overlay,
                    conn,
                    conn_index,
                    endpoints,
                    placements,
                    local_interfaces: &local_interfaces,
                };
                self.ctx
                    .mesh_builder
                    .build_mesh(ns, req)
                    .map_err(|e| ns.record_error(e))?;
                info!(
                    "connection {} rendered across {} and {}",
                    conn_index, placements[0].host, placements[1].host
                );
                Ok(())
            }
            (OverlayTransport::Vxlan, topology) => {
                Err(ns.record_error(RenderError::UnsupportedOverlayTopology {
                    service: ns.name.clone(),
                    conn_index,
                    endpoint_a: endpoints[0].to_string(),
                    endpoint_b: endpoints[1].to_string(),
                    overlay: overlay.name.clone(),
                    topology: topology.to_string(),
                }))
            }
            (transport, _) => Err(ns.record_error(RenderError::UnsupportedOverlayTransport {
                service: ns.name.clone(),
                conn_index,
                endpoint_a: endpoints[0].to_string(),
                endpoint_b: endpoints[1].to_string(),
                overlay: overlay.name.clone(),
                transport: transport.to_string(),
            })),
        }
    }
}
