//! Reconciliation driver
//!
//! Holds the known network services and re-renders the ones marked
//! pending on each pass. Services render concurrently on tokio tasks, at
//! most `workers` at a time; each service sits behind its own mutex so
//! its status is only ever mutated by one render at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use nsc_cfgmgr_common::Orch;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::l2pp_mgr::{L2ppMgr, ServiceRenderSummary};
use crate::types::NetworkService;

/// A network service shared between the driver and render tasks
pub type SharedService = Arc<Mutex<NetworkService>>;

/// Drives [`L2ppMgr::render_service`] over every pending service
pub struct Reconciler {
    mgr: Arc<L2ppMgr>,
    services: BTreeMap<String, SharedService>,
    pending: BTreeSet<String>,
    workers: Arc<Semaphore>,
    last_pass: Vec<ServiceRenderSummary>,
}

impl Reconciler {
    pub fn new(mgr: Arc<L2ppMgr>, workers: usize) -> Self {
        Self {
            mgr,
            services: BTreeMap::new(),
            pending: BTreeSet::new(),
            workers: Arc::new(Semaphore::new(workers.max(1))),
            last_pass: Vec::new(),
        }
    }

    pub fn mgr(&self) -> &Arc<L2ppMgr> {
        &self.mgr
    }

    /// Add a service or update its spec, marking it pending if anything changed
    pub fn upsert_service(&mut self, ns: NetworkService) {
        let name = ns.name.clone();
        match self.services.get(&name) {
            Some(existing) => {
                let mut current = existing.lock();
                if current.spec == ns.spec {
                    return;
                }
                debug!("spec of {} changed", name);
                current.spec = ns.spec;
            }
            None => {
                debug!("new service {}", name);
                self.services.insert(name.clone(), Arc::new(Mutex::new(ns)));
            }
        }
        self.pending.insert(name);
    }

    /// Forget a service, returning its last state
    pub fn remove_service(&mut self, name: &str) -> Option<NetworkService> {
        self.pending.remove(name);
        self.mgr.ctx().mesh_builder.release_service(name);
        self.services.remove(name).map(|svc| svc.lock().clone())
    }

    /// Make the known set of services exactly `services`
    pub fn sync_services(&mut self, services: Vec<NetworkService>) {
        let wanted: BTreeSet<String> = services.iter().map(|s| s.name.clone()).collect();
        let stale: Vec<String> = self
            .services
            .keys()
            .filter(|name| !wanted.contains(*name))
            .cloned()
            .collect();
        for name in stale {
            info!("service {} removed", name);
            self.remove_service(&name);
        }
        for ns in services {
            self.upsert_service(ns);
        }
    }

    /// Re-render every service on the next pass, e.g. after placement changes
    pub fn mark_all_pending(&mut self) {
        self.pending.extend(self.services.keys().cloned());
    }

    pub fn service(&self, name: &str) -> Option<SharedService> {
        self.services.get(name).cloned()
    }

    /// Copies of every service, in name order
    pub fn services(&self) -> Vec<NetworkService> {
        self.services.values().map(|svc| svc.lock().clone()).collect()
    }

    /// Summaries of the most recent pass, in service name order
    pub fn last_pass(&self) -> &[ServiceRenderSummary] {
        &self.last_pass
    }

    /// Render every pending service once
    ///
    /// A service whose connections failed is not retried until it is
    /// marked pending again.
    pub async fn reconcile(&mut self) -> &[ServiceRenderSummary] {
        let pending = std::mem::take(&mut self.pending);
        let mut tasks = JoinSet::new();

        for name in pending {
            let Some(svc) = self.services.get(&name).cloned() else {
                continue;
            };
            let mgr = self.mgr.clone();
            let workers = self.workers.clone();
            tasks.spawn(async move {
                let _permit = workers.acquire_owned().await.ok();
                let mut ns = svc.lock();
                mgr.render_service(&mut ns).summary()
            });
        }

        let mut summaries = Vec::with_capacity(tasks.len());
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(summary) => {
                    if !summary.failed.is_empty() {
                        warn!(
                            "service {}: connections {:?} failed to render",
                            summary.service, summary.failed
                        );
                    }
                    summaries.push(summary);
                }
                Err(e) => warn!("render task failed: {}", e),
            }
        }
        summaries.sort_by(|a, b| a.service.cmp(&b.service));

        info!("reconciled {} services", summaries.len());
        self.last_pass = summaries;
        &self.last_pass
    }
}

#[async_trait]
impl Orch for Reconciler {
    fn name(&self) -> &str {
        "L2ppMgr"
    }

    async fn do_task(&mut self) {
        self.reconcile().await;
    }

    fn has_pending_tasks(&self) -> bool {
        !self.pending.is_empty()
    }

    fn dump_pending_tasks(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }
}
