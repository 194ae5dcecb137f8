//! Interface runtime state and fast-path id coordination
//!
//! Runtime state outlives a single render call and is shared by every
//! service rendered on the same hosts. [`InMemoryInterfaceStateStore`]
//! guards the whole map with one mutex and every store operation,
//! including the read-check-reset of [`InterfaceStateStore::reset_if_colliding`]
//! and the socket-wide search of [`InterfaceStateStore::allocate_on_socket`],
//! runs entirely under it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ResolvedEndpoint;

/// Runtime state of one interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRuntimeState {
    /// Allocated fast-path channel id; 0 means unallocated
    pub fast_path_id: u32,
    /// Memif socket the id was allocated on; ids are only unique per socket
    #[serde(default)]
    pub socket: String,
}

impl InterfaceRuntimeState {
    pub fn is_allocated(&self) -> bool {
        self.fast_path_id != 0
    }
}

/// Store of interface runtime state keyed by `parent/interface`
pub trait InterfaceStateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<InterfaceRuntimeState>;

    fn set_allocated(&self, key: &str, fast_path_id: u32);

    fn clear_allocated(&self, key: &str);

    /// Reset both interfaces to unallocated if both exist and carry the
    /// same allocated id. Returns true if a reset happened.
    fn reset_if_colliding(&self, a: &str, b: &str) -> bool;

    /// Id of `key` on `socket`.
    ///
    /// An id already held on `socket` is kept unless another interface on
    /// the same socket holds it too; otherwise the lowest id free on
    /// `socket` is assigned.
    fn allocate_on_socket(&self, key: &str, socket: &str) -> u32;
}

/// Mutex-guarded in-memory store
#[derive(Debug, Default)]
pub struct InMemoryInterfaceStateStore {
    states: Mutex<HashMap<String, InterfaceRuntimeState>>,
}

impl InMemoryInterfaceStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InterfaceStateStore for InMemoryInterfaceStateStore {
    fn get(&self, key: &str) -> Option<InterfaceRuntimeState> {
        self.states.lock().get(key).cloned()
    }

    fn set_allocated(&self, key: &str, fast_path_id: u32) {
        self.states
            .lock()
            .entry(key.to_string())
            .or_default()
            .fast_path_id = fast_path_id;
    }

    fn clear_allocated(&self, key: &str) {
        if let Some(state) = self.states.lock().get_mut(key) {
            state.fast_path_id = 0;
        }
    }

    fn reset_if_colliding(&self, a: &str, b: &str) -> bool {
        let mut states = self.states.lock();
        let colliding = match (states.get(a), states.get(b)) {
            (Some(sa), Some(sb)) => sa.is_allocated() && sa.fast_path_id == sb.fast_path_id,
            _ => false,
        };
        if colliding {
            for key in [a, b] {
                if let Some(state) = states.get_mut(key) {
                    state.fast_path_id = 0;
                }
            }
        }
        colliding
    }

    fn allocate_on_socket(&self, key: &str, socket: &str) -> u32 {
        let mut states = self.states.lock();
        let used: HashSet<u32> = states
            .iter()
            .filter(|(k, s)| k.as_str() != key && s.socket == socket && s.is_allocated())
            .map(|(_, s)| s.fast_path_id)
            .collect();

        if let Some(state) = states.get(key) {
            if state.is_allocated() && state.socket == socket && !used.contains(&state.fast_path_id) {
                return state.fast_path_id;
            }
        }

        let mut id = 1;
        while used.contains(&id) {
            id += 1;
        }
        states.insert(
            key.to_string(),
            InterfaceRuntimeState {
                fast_path_id: id,
                socket: socket.to_string(),
            },
        );
        id
    }
}

/// Allocates fast-path ids and clears stale allocations
///
/// Ids are scoped to the memif socket they are used on: an interface
/// moved to another socket, or sharing an id with a neighbour on its
/// socket, gets the lowest id still free there.
pub struct InterfaceStateCoordinator {
    store: Arc<dyn InterfaceStateStore>,
}

impl InterfaceStateCoordinator {
    pub fn new(store: Arc<dyn InterfaceStateStore>) -> Self {
        Self { store }
    }

    /// Coordinator over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryInterfaceStateStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn InterfaceStateStore> {
        &self.store
    }

    /// Clear identical ids left behind on a pair by an earlier rendering
    pub fn reset_stale_pair(&self, a: &ResolvedEndpoint, b: &ResolvedEndpoint) -> bool {
        let (ka, kb) = (a.state_key(), b.state_key());
        debug!("checking for equal fast-path ids on {} and {}", ka, kb);
        let reset = self.store.reset_if_colliding(&ka, &kb);
        if reset {
            debug!("reset fast-path ids on {} and {} for reallocation", ka, kb);
        }
        reset
    }

    /// Id of `key` on `socket`, allocating one if needed
    pub fn ensure_allocated(&self, key: &str, socket: &str) -> u32 {
        let id = self.store.allocate_on_socket(key, socket);
        debug!("fast-path id {} for {} on {}", id, key, socket);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Interface, InterfaceType, ParentType};

    fn endpoint(parent: &str, name: &str) -> ResolvedEndpoint {
        ResolvedEndpoint {
            host: "node1".to_string(),
            interface: Interface::new(name, InterfaceType::Memif),
            parent: parent.to_string(),
            parent_type: ParentType::Workload,
        }
    }

    #[test]
    fn test_store_set_get_clear() {
        let store = InMemoryInterfaceStateStore::new();
        assert!(store.get("podX/eth0").is_none());

        store.set_allocated("podX/eth0", 3);
        assert_eq!(store.get("podX/eth0").unwrap().fast_path_id, 3);

        store.clear_allocated("podX/eth0");
        assert!(!store.get("podX/eth0").unwrap().is_allocated());

        // clearing an unknown key does not create it
        store.clear_allocated("podY/eth0");
        assert!(store.get("podY/eth0").is_none());
    }

    #[test]
    fn test_reset_if_colliding() {
        let store = InMemoryInterfaceStateStore::new();
        store.set_allocated("podX/eth0", 5);
        store.set_allocated("podY/eth0", 5);

        assert!(store.reset_if_colliding("podX/eth0", "podY/eth0"));
        assert_eq!(store.get("podX/eth0").unwrap().fast_path_id, 0);
        assert_eq!(store.get("podY/eth0").unwrap().fast_path_id, 0);
    }

    #[test]
    fn test_reset_skips_distinct_or_missing() {
        let store = InMemoryInterfaceStateStore::new();
        store.set_allocated("podX/eth0", 5);
        store.set_allocated("podY/eth0", 6);
        assert!(!store.reset_if_colliding("podX/eth0", "podY/eth0"));
        assert_eq!(store.get("podX/eth0").unwrap().fast_path_id, 5);

        assert!(!store.reset_if_colliding("podX/eth0", "podZ/eth0"));

        // two unallocated interfaces are not a collision
        store.set_allocated("podA/eth0", 0);
        store.set_allocated("podB/eth0", 0);
        assert!(!store.reset_if_colliding("podA/eth0", "podB/eth0"));
    }

    const SOCK1: &str = "/var/run/nsc/memif_node1_podX.sock";
    const SOCK2: &str = "/var/run/nsc/memif_node2_podX.sock";

    #[test]
    fn test_coordinator_allocates_distinct_ids_per_socket() {
        let coord = InterfaceStateCoordinator::in_memory();
        let a = coord.ensure_allocated("podX/eth0", SOCK1);
        let b = coord.ensure_allocated("podX/eth1", SOCK1);
        assert_eq!((a, b), (1, 2));

        // already allocated ids are kept
        assert_eq!(coord.ensure_allocated("podX/eth0", SOCK1), a);

        // sockets count independently
        assert_eq!(coord.ensure_allocated("podZ/eth0", SOCK2), 1);
    }

    #[test]
    fn test_moving_socket_reallocates_lowest_free_id() {
        let coord = InterfaceStateCoordinator::in_memory();
        assert_eq!(coord.ensure_allocated("podX/eth0", SOCK1), 1);

        // podX moved hosts: eth2 lands on the new socket first
        assert_eq!(coord.ensure_allocated("podX/eth2", SOCK2), 1);
        assert_eq!(coord.ensure_allocated("podX/eth0", SOCK2), 2);
        assert_eq!(coord.store().get("podX/eth0").unwrap().socket, SOCK2);

        // the freed id on the old socket is handed out again
        assert_eq!(coord.ensure_allocated("podX/eth9", SOCK1), 1);
    }

    #[test]
    fn test_prefilled_duplicate_id_is_reallocated() {
        let store = InMemoryInterfaceStateStore::new();
        assert_eq!(store.allocate_on_socket("podX/eth0", SOCK1), 1);
        assert_eq!(store.allocate_on_socket("podX/eth1", SOCK1), 2);
        // an earlier writer left eth1 on eth0's id
        store.set_allocated("podX/eth1", 1);

        assert_eq!(store.allocate_on_socket("podX/eth1", SOCK1), 2);
        assert_eq!(store.get("podX/eth0").unwrap().fast_path_id, 1);
    }

    #[test]
    fn test_coordinator_reset_then_reallocate() {
        let coord = InterfaceStateCoordinator::in_memory();
        coord.store().set_allocated("podX/eth0", 5);
        coord.store().set_allocated("podY/eth0", 5);

        let (x, y) = (endpoint("podX", "eth0"), endpoint("podY", "eth0"));
        assert!(coord.reset_stale_pair(&x, &y));
        assert!(!coord.reset_stale_pair(&x, &y));

        let a = coord.ensure_allocated(&x.state_key(), SOCK1);
        let b = coord.ensure_allocated(&y.state_key(), SOCK1);
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }
}
