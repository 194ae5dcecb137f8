//! Same-host versus cross-host classification

use nsc_cfgmgr_common::{RenderError, RenderResult};
use tracing::debug;

use crate::collaborators::OverlayRegistry;
use crate::types::{Connection, NetworkService, OverlayDefinition, ResolvedEndpoint};

/// Where a connection is realized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// Both endpoints are on this host
    SameHost(String),
    /// Endpoints are on different hosts, stitched through this overlay
    CrossHost(OverlayDefinition),
}

/// Decide same-host vs cross-host for two resolved endpoints
///
/// A static host endpoint pins both sides to one host, so endpoints on
/// different hosts are never tunneled in that case.
pub fn classify(
    ns: &mut NetworkService,
    conn: &Connection,
    endpoints: &[ResolvedEndpoint; 2],
    static_host: bool,
    overlays: &dyn OverlayRegistry,
) -> RenderResult<Topology> {
    let [a, b] = endpoints;

    if a.host == b.host {
        debug!("{} and {} are both on {}", a, b, a.host);
        return Ok(Topology::SameHost(a.host.clone()));
    }

    if static_host {
        return Err(ns.record_error(RenderError::HostMismatch {
            service: ns.name.clone(),
            host_a: a.host.clone(),
            host_b: b.host.clone(),
        }));
    }

    let name = match conn.overlay.as_deref().filter(|o| !o.is_empty()) {
        Some(name) => name,
        None => {
            return Err(ns.record_error(RenderError::MissingOverlay {
                service: ns.name.clone(),
                endpoint_a: a.to_string(),
                endpoint_b: b.to_string(),
            }))
        }
    };

    match overlays.lookup(name) {
        Some(overlay) => {
            debug!("{} on {} to {} on {} via overlay {}", a, a.host, b, b.host, name);
            Ok(Topology::CrossHost(overlay))
        }
        None => Err(ns.record_error(RenderError::UnknownOverlay {
            service: ns.name.clone(),
            endpoint_a: a.to_string(),
            endpoint_b: b.to_string(),
            overlay: name.to_string(),
        })),
    }
}
