//! Same-host rendering
//!
//! Three realizations, tried in order:
//!
//! 1. loopback: two interfaces of one workload (or host) cross-connected
//!    inside their parent, no switch-side interfaces
//! 2. direct fast-path pairing of two memifs when the method is `direct`
//! 3. a switch-facing interface per endpoint, cross-connected in the vswitch

use nsc_cfgmgr_common::RenderResult;
use tracing::{debug, info, instrument};

use crate::collaborators::{ConfigEntryBuilder, RenderContext};
use crate::types::{
    ConfigEntry, ConnMethod, Connection, NetworkService, ResolvedEndpoint, PAIR_DIRECTIONS,
};

/// Both directions of a cross-connect between `names[0]` and `names[1]` on `agent`
pub fn cross_connect_pair(
    builder: &dyn ConfigEntryBuilder,
    agent: &str,
    names: [&str; 2],
) -> [ConfigEntry; 2] {
    PAIR_DIRECTIONS.map(|(i, j)| builder.cross_connect(agent, names[i], names[j]))
}

/// Renders connections whose endpoints share a host
pub struct SameHostRenderer<'a> {
    ctx: &'a RenderContext,
}

impl<'a> SameHostRenderer<'a> {
    pub fn new(ctx: &'a RenderContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, ns, conn, endpoints), fields(service = %ns.name))]
    pub fn render(
        &self,
        ns: &mut NetworkService,
        host: &str,
        conn: &Connection,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> RenderResult<()> {
        let [a, b] = endpoints;

        if a.parent == b.parent && a.name() != b.name() {
            return self.render_loopback(ns, endpoints);
        }

        let both_fast_path = endpoints.iter().all(|e| e.if_type().is_fast_path());
        if both_fast_path && conn.effective_conn_method() == ConnMethod::Direct {
            return self.render_direct(ns, host, endpoints);
        }
        self.render_via_switch(ns, host, conn, endpoints)
    }

    fn render_loopback(&self, ns: &mut NetworkService, endpoints: &[ResolvedEndpoint; 2]) -> RenderResult<()> {
        let parent = &endpoints[0].parent;
        let entries = cross_connect_pair(
            self.ctx.entries.as_ref(),
            parent,
            [endpoints[0].name(), endpoints[1].name()],
        );
        ns.add_rendered_entries(entries);

        info!(
            "looped {} to {} inside {}",
            endpoints[0].name(),
            endpoints[1].name(),
            parent
        );
        Ok(())
    }

    fn render_direct(
        &self,
        ns: &mut NetworkService,
        host: &str,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> RenderResult<()> {
        let [a, b] = endpoints;
        self.ctx.if_states.reset_stale_pair(a, b);

        self.ctx
            .interfaces
            .create_direct_pair(ns, host, endpoints)
            .map_err(|e| ns.record_error(e))?;

        info!("paired {} with {} directly on {}", a, b, host);
        Ok(())
    }

    fn render_via_switch(
        &self,
        ns: &mut NetworkService,
        host: &str,
        conn: &Connection,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> RenderResult<()> {
        let [a, b] = endpoints;
        if a.if_type().is_fast_path() && b.if_type().is_fast_path() {
            // each side gets its own switch memif, so shared ids must go
            self.ctx.if_states.reset_stale_pair(a, b);
        }

        let mut switch_names: [String; 2] = Default::default();
        for (name, endpoint) in switch_names.iter_mut().zip(endpoints) {
            let created = self
                .ctx
                .interfaces
                .create_pair(ns, host, conn, endpoint, None)
                .map_err(|e| ns.record_error(e))?;
            debug!("{} attached to the vswitch as {}", endpoint, created.name);
            *name = created.name;
        }

        let entries = cross_connect_pair(
            self.ctx.entries.as_ref(),
            host,
            [switch_names[0].as_str(), switch_names[1].as_str()],
        );
        ns.add_rendered_entries(entries);

        info!(
            "cross-connected {} and {} through the vswitch on {}",
            endpoints[0], endpoints[1], host
        );
        Ok(())
    }
}
