//! Vswitch Interface Creator - switch-facing interfaces for connection endpoints
//!
//! Host interfaces already sit on the vswitch and are used as-is. Workload
//! interfaces get a workload-side half rendered for the workload agent and
//! a switch-side half rendered for the host's vswitch.

use std::sync::Arc;

use nsc_cfgmgr_common::{RenderError, RenderResult};
use tracing::{debug, instrument};

use crate::collaborators::{InterfaceCreator, SwitchInterface};
use crate::entries::{
    build_afpacket_entry, build_ethernet_entry, build_memif_entry, build_tap_entry,
    build_veth_entry, direct_memif_socket_path, memif_socket_path,
};
use crate::if_state::InterfaceStateCoordinator;
use crate::tables::if_prefix;
use crate::types::{
    Connection, InterfaceType, NetworkService, ParentType, ResolvedEndpoint,
};

/// Generated vswitch-side name for a workload interface
pub fn vswitch_if_name(prefix: &str, endpoint: &ResolvedEndpoint) -> String {
    format!("{}_{}_{}", prefix, endpoint.parent, endpoint.name())
}

/// Default [`InterfaceCreator`] rendering entries for the host vswitch
pub struct VswitchInterfaceCreator {
    if_states: Arc<InterfaceStateCoordinator>,
}

impl VswitchInterfaceCreator {
    pub fn new(if_states: Arc<InterfaceStateCoordinator>) -> Self {
        Self { if_states }
    }

    fn unsupported(ns: &NetworkService, endpoint: &ResolvedEndpoint) -> RenderError {
        RenderError::UnsupportedInterfaceType {
            service: ns.name.clone(),
            parent: endpoint.parent.clone(),
            interface: endpoint.name().to_string(),
            if_type: endpoint.if_type().to_string(),
        }
    }

    fn create_memif(
        &self,
        ns: &mut NetworkService,
        host: &str,
        endpoint: &ResolvedEndpoint,
        switch_name: String,
    ) -> SwitchInterface {
        let socket = memif_socket_path(host, &endpoint.parent);
        let id = self.if_states.ensure_allocated(&endpoint.state_key(), &socket);
        let mtu = endpoint.interface.mtu;

        ns.add_rendered_entries([
            build_memif_entry(&endpoint.parent, endpoint.name(), id, false, &socket, mtu),
            build_memif_entry(host, &switch_name, id, true, &socket, mtu),
        ]);

        SwitchInterface {
            name: switch_name,
            fast_path_id: Some(id),
        }
    }

    fn create_veth(
        &self,
        ns: &mut NetworkService,
        host: &str,
        endpoint: &ResolvedEndpoint,
        switch_name: String,
    ) -> SwitchInterface {
        let vswitch_veth = vswitch_if_name(if_prefix::VETH_VSWITCH, endpoint);
        let workload_veth = format!("{}_{}", endpoint.parent, endpoint.name());

        ns.add_rendered_entries([
            build_veth_entry(&endpoint.parent, endpoint.name(), &workload_veth, &vswitch_veth),
            build_veth_entry(host, &vswitch_veth, &vswitch_veth, &workload_veth),
            build_afpacket_entry(host, &switch_name, &vswitch_veth),
        ]);

        SwitchInterface {
            name: switch_name,
            fast_path_id: None,
        }
    }
}

impl InterfaceCreator for VswitchInterfaceCreator {
    #[instrument(skip(self, ns, conn, endpoint), fields(endpoint = %endpoint))]
    fn create_pair(
        &self,
        ns: &mut NetworkService,
        host: &str,
        conn: &Connection,
        endpoint: &ResolvedEndpoint,
        hint: Option<&str>,
    ) -> RenderResult<SwitchInterface> {
        if endpoint.parent_type == ParentType::Host {
            if endpoint.if_type() == InterfaceType::Ethernet {
                ns.add_rendered_entries([build_ethernet_entry(
                    host,
                    endpoint.name(),
                    endpoint.interface.mtu,
                )]);
            }
            debug!("host interface {} used as its own switch side", endpoint);
            return Ok(SwitchInterface {
                name: endpoint.name().to_string(),
                fast_path_id: None,
            });
        }

        let prefix = match endpoint.if_type() {
            InterfaceType::Memif => if_prefix::MEMIF_VSWITCH,
            InterfaceType::Veth => if_prefix::AFPIF_VSWITCH,
            InterfaceType::Tap => if_prefix::TAP_VSWITCH,
            InterfaceType::Ethernet => return Err(Self::unsupported(ns, endpoint)),
        };
        let switch_name = hint
            .map(str::to_string)
            .unwrap_or_else(|| vswitch_if_name(prefix, endpoint));

        let created = match endpoint.if_type() {
            InterfaceType::Memif => self.create_memif(ns, host, endpoint, switch_name),
            InterfaceType::Veth => self.create_veth(ns, host, endpoint, switch_name),
            InterfaceType::Tap => {
                ns.add_rendered_entries([build_tap_entry(host, &switch_name, endpoint.name())]);
                SwitchInterface {
                    name: switch_name,
                    fast_path_id: None,
                }
            }
            InterfaceType::Ethernet => return Err(Self::unsupported(ns, endpoint)),
        };

        debug!(
            "created {} on {} for {} ({} connection)",
            created.name,
            host,
            endpoint,
            conn.conn_type.as_str()
        );
        Ok(created)
    }

    #[instrument(skip(self, ns, endpoints))]
    fn create_direct_pair(
        &self,
        ns: &mut NetworkService,
        host: &str,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> RenderResult<()> {
        if let Some(ep) = endpoints.iter().find(|e| !e.if_type().is_fast_path()) {
            return Err(Self::unsupported(ns, ep));
        }

        let [master, slave] = endpoints;
        // A pairing gets its own socket, apart from the vswitch's per-workload one
        let socket = direct_memif_socket_path(host, &master.parent, &slave.parent);
        let ids = endpoints
            .each_ref()
            .map(|e| self.if_states.ensure_allocated(&e.state_key(), &socket));

        // The slave dials the master's id
        ns.add_rendered_entries([
            build_memif_entry(&master.parent, master.name(), ids[0], true, &socket, master.interface.mtu),
            build_memif_entry(&slave.parent, slave.name(), ids[0], false, &socket, slave.interface.mtu),
        ]);

        debug!(
            "paired {} (id {}) directly with {} (id {}) on {}",
            master, ids[0], slave, ids[1], host
        );
        Ok(())
    }
}
