//! VXLAN mesh builder
//!
//! Stitches the two local halves of a cross-host connection together with
//! one VXLAN tunnel per host. VNIs are handed out per overlay and keyed by
//! service and connection index, so connections of different services
//! sharing an overlay never land on the same segment.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use nsc_cfgmgr_common::{RenderError, RenderResult};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::collaborators::{ConfigEntryBuilder, HostRegistry, MeshRequest, OverlayMeshBuilder};
use crate::entries::build_vxlan_entry;
use crate::tables::if_prefix;
use crate::types::{NetworkService, OverlayDefinition, PAIR_DIRECTIONS};

/// Name of the tunnel interface carrying `vni`
pub fn vxlan_if_name(vni: u32) -> String {
    format!("{}_{}", if_prefix::VXLAN, vni)
}

type VniKey = (String, u32);

/// Per-overlay VNI assignments keyed by `(service, conn_index)`
#[derive(Default)]
pub struct VniAllocator {
    overlays: Mutex<HashMap<String, BTreeMap<VniKey, u32>>>,
}

impl VniAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// VNI for connection `conn_index` of `service` on `overlay`.
    ///
    /// An existing in-range assignment is kept; otherwise the lowest VNI of
    /// the range not held by another connection is taken.
    pub fn allocate(
        &self,
        overlay: &OverlayDefinition,
        service: &str,
        conn_index: u32,
    ) -> RenderResult<u32> {
        let (start, end) = (overlay.vni_range_start, overlay.vni_range_end);
        if start == 0 {
            return Err(RenderError::overlay(&overlay.name, "no vni range configured"));
        }

        let mut overlays = self.overlays.lock();
        let assigned = overlays.entry(overlay.name.clone()).or_default();
        let key = (service.to_string(), conn_index);

        if let Some(vni) = assigned.get(&key).copied() {
            if (start..=end).contains(&vni) {
                return Ok(vni);
            }
        }

        let used: BTreeSet<u32> = assigned
            .iter()
            .filter(|(k, _)| **k != key)
            .map(|(_, vni)| *vni)
            .collect();
        let vni = (start..=end).find(|vni| !used.contains(vni)).ok_or_else(|| {
            RenderError::overlay(
                &overlay.name,
                format!(
                    "vni range {}-{} exhausted at {} connection {}",
                    start, end, service, conn_index
                ),
            )
        })?;
        assigned.insert(key, vni);
        Ok(vni)
    }

    /// Drop every assignment held by `service`, returning how many were freed
    pub fn release_service(&self, service: &str) -> usize {
        let mut overlays = self.overlays.lock();
        let mut freed = 0;
        for assigned in overlays.values_mut() {
            let before = assigned.len();
            assigned.retain(|(svc, _), _| svc != service);
            freed += before - assigned.len();
        }
        freed
    }
}

/// Default [`OverlayMeshBuilder`] for vxlan full-mesh overlays
pub struct VxlanMeshBuilder {
    hosts: Arc<dyn HostRegistry>,
    entries: Arc<dyn ConfigEntryBuilder>,
    vnis: VniAllocator,
}

impl VxlanMeshBuilder {
    pub fn new(hosts: Arc<dyn HostRegistry>, entries: Arc<dyn ConfigEntryBuilder>) -> Self {
        Self {
            hosts,
            entries,
            vnis: VniAllocator::new(),
        }
    }

    fn underlay(&self, overlay: &OverlayDefinition, host: &str) -> RenderResult<String> {
        self.hosts.underlay_address(host).ok_or_else(|| {
            RenderError::overlay(&overlay.name, format!("host {} has no underlay address", host))
        })
    }
}

impl OverlayMeshBuilder for VxlanMeshBuilder {
    #[instrument(skip_all, fields(service = %ns.name, overlay = %req.overlay.name, conn = req.conn_index))]
    fn build_mesh(&self, ns: &mut NetworkService, req: MeshRequest<'_>) -> RenderResult<()> {
        let vni = self.vnis.allocate(req.overlay, &ns.name, req.conn_index)?;
        let hosts = [&req.placements[0].host, &req.placements[1].host];
        let underlay = [
            self.underlay(req.overlay, hosts[0])?,
            self.underlay(req.overlay, hosts[1])?,
        ];
        let tunnel = vxlan_if_name(vni);

        let mut entries = Vec::with_capacity(6);
        for (i, j) in PAIR_DIRECTIONS {
            let host = hosts[i];
            debug!("vxlan {} on {}: {} -> {}", tunnel, host, underlay[i], underlay[j]);
            entries.push(build_vxlan_entry(host, &tunnel, &underlay[i], &underlay[j], vni));
            entries.push(self.entries.cross_connect(host, &req.local_interfaces[i], &tunnel));
            entries.push(self.entries.cross_connect(host, &tunnel, &req.local_interfaces[i]));
        }
        ns.add_rendered_entries(entries);

        info!(
            "{} on {} meshed with {} on {} over vni {}",
            req.endpoints[0], hosts[0], req.endpoints[1], hosts[1], vni
        );
        Ok(())
    }

    fn release_service(&self, service: &str) {
        let freed = self.vnis.release_service(service);
        if freed > 0 {
            debug!("released {} vni(s) held by {}", freed, service);
        }
    }
}
