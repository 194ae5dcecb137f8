//! Endpoint resolution for L2PP connections
//!
//! Turns the declared workload references, host references and host
//! interface label selector of a connection into exactly two endpoints,
//! each bound to a placed host and a concrete interface.

use nsc_cfgmgr_common::{RenderError, RenderResult};
use tracing::{debug, instrument};

use crate::collaborators::{HostRegistry, PlacementDirectory};
use crate::types::{
    Connection, EndpointRef, Interface, NetworkService, ParentType, PlacementRecord,
    ResolvedEndpoint,
};

/// The two endpoints of a connection and where they live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub endpoints: [ResolvedEndpoint; 2],
    pub placements: [PlacementRecord; 2],
    /// An endpoint came from a host reference or label, pinning both to one host
    pub static_host: bool,
}

/// Resolves connection endpoints against placement and host registry facts
pub struct EndpointResolver<'a> {
    placements: &'a dyn PlacementDirectory,
    hosts: &'a dyn HostRegistry,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(placements: &'a dyn PlacementDirectory, hosts: &'a dyn HostRegistry) -> Self {
        Self { placements, hosts }
    }

    /// Resolve both endpoints of `conn`
    ///
    /// Every failure is appended to the service status before returning.
    #[instrument(skip_all, fields(service = %ns.name))]
    pub fn resolve(&self, ns: &mut NetworkService, conn: &Connection) -> RenderResult<Resolution> {
        debug!(
            "workload interfaces: {}, host interfaces: {}, host labels: {}",
            conn.workload_interfaces.len(),
            conn.host_interfaces.len(),
            conn.host_interface_labels.len()
        );

        let declared = conn.declared_endpoints();
        if declared > 2 {
            return Err(ns.record_error(RenderError::TooManySegments {
                service: ns.name.clone(),
                count: declared,
            }));
        }

        let placed = self.place_workloads(ns, &conn.workload_interfaces)?;

        let mut resolved: Vec<(ResolvedEndpoint, PlacementRecord)> = Vec::with_capacity(2);
        for (r, host) in placed {
            let interface = match ns.find_workload_interface(&r.parent, &r.interface).cloned() {
                Some(intf) => intf,
                None => {
                    return Err(ns.record_error(RenderError::unknown_interface(
                        &ns.name,
                        &r.parent,
                        &r.interface,
                    )))
                }
            };
            resolved.push((
                ResolvedEndpoint {
                    host: host.clone(),
                    interface,
                    parent: r.parent.clone(),
                    parent_type: ParentType::Workload,
                },
                PlacementRecord::new(&r.parent, host),
            ));
        }

        let mut static_host = false;
        for r in &conn.host_interfaces {
            let interface = match self.hosts.find_interface(&r.parent, &r.interface) {
                Some(intf) => intf,
                None => {
                    return Err(ns.record_error(RenderError::unknown_interface(
                        &ns.name,
                        &r.parent,
                        &r.interface,
                    )))
                }
            };
            resolved.push((host_endpoint(&r.parent, interface), host_placement(&r.parent)));
            static_host = true;
        }

        if !conn.host_interface_labels.is_empty() {
            let (endpoint, placement) = self.resolve_label(ns, conn, &resolved)?;
            resolved.push((endpoint, placement));
            static_host = true;
        }

        let found = resolved.len();
        let [(e0, p0), (e1, p1)]: [(ResolvedEndpoint, PlacementRecord); 2] =
            match resolved.try_into() {
                Ok(pair) => pair,
                Err(_) => {
                    return Err(ns.record_error(RenderError::IncompleteConnection {
                        service: ns.name.clone(),
                        found,
                    }))
                }
            };

        debug!(
            "resolved {} on {} and {} on {}, static host: {}",
            e0, e0.host, e1, e1.host, static_host
        );

        Ok(Resolution {
            endpoints: [e0, e1],
            placements: [p0, p1],
            static_host,
        })
    }

    /// Look up every workload's host, reporting all placement problems together
    fn place_workloads<'r>(
        &self,
        ns: &mut NetworkService,
        refs: &'r [EndpointRef],
    ) -> RenderResult<Vec<(&'r EndpointRef, String)>> {
        let mut placed = Vec::with_capacity(refs.len());
        let mut unplaced = Vec::new();

        for (i, r) in refs.iter().enumerate() {
            let host = match self.placements.lookup(&r.parent).filter(|h| !h.is_empty()) {
                Some(host) => host,
                None => {
                    ns.append_status_msg(format!(
                        "connection segment {}: {}, workload not mapped to a host in the placement directory",
                        i, r
                    ));
                    unplaced.push(r.to_string());
                    continue;
                }
            };
            if !self.hosts.exists(&host) {
                ns.append_status_msg(format!(
                    "connection segment {}: {}, workload references non existent host: {}",
                    i, r, host
                ));
                unplaced.push(r.to_string());
                continue;
            }
            placed.push((r, host));
        }

        if !unplaced.is_empty() {
            return Err(ns.record_error(RenderError::PlacementIncomplete {
                service: ns.name.clone(),
                unplaced,
            }));
        }
        Ok(placed)
    }

    /// Fill the second slot from the host interface label selector
    fn resolve_label(
        &self,
        ns: &mut NetworkService,
        conn: &Connection,
        resolved: &[(ResolvedEndpoint, PlacementRecord)],
    ) -> RenderResult<(ResolvedEndpoint, PlacementRecord)> {
        let labels = &conn.host_interface_labels;

        if resolved.len() >= 2 {
            return Err(ns.record_error(RenderError::TooManySegments {
                service: ns.name.clone(),
                count: resolved.len() + 1,
            }));
        }
        let first = match resolved {
            [(first, _)] if labels.len() == 1 => first,
            _ => {
                return Err(ns.record_error(RenderError::InvalidLabelSelector {
                    service: ns.name.clone(),
                    resolved: resolved.len(),
                    labels: labels.len(),
                }))
            }
        };

        let host = first.host.clone();
        let matches = self.hosts.find_interfaces_by_label(&host, labels);
        match <[Interface; 1]>::try_from(matches) {
            Ok([interface]) => {
                debug!("label {:?} resolved to {}/{}", labels, host, interface.name);
                Ok((host_endpoint(&host, interface), host_placement(&host)))
            }
            Err(matches) => Err(ns.record_error(RenderError::AmbiguousLabel {
                service: ns.name.clone(),
                host,
                labels: labels.clone(),
                matched: matches.len(),
            })),
        }
    }
}

fn host_endpoint(host: &str, interface: Interface) -> ResolvedEndpoint {
    ResolvedEndpoint {
        host: host.to_string(),
        interface,
        parent: host.to_string(),
        parent_type: ParentType::Host,
    }
}

fn host_placement(host: &str) -> PlacementRecord {
    PlacementRecord::new(host, host)
}
