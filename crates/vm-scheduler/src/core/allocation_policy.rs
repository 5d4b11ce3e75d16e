//! Allocation policy (§4.C): a pure, side-effect-free selector invoked once
//! per dequeued request.

use std::cell::RefCell;
use std::rc::Rc;

use dslab_core::component::Id as HostId;

use crate::core::host_view::HostView;
use crate::core::vm::Server;

/// Produces a host (or none) for a pending server from a live candidate set.
/// Implementations must not mutate `candidates` or `server`.
pub trait AllocationPolicy {
    fn select(&self, candidates: &[Rc<RefCell<HostView>>], server: &Server) -> Option<HostId>;
}

/// Reference policy: among hosts that fit the server, prefer the one with
/// the most active servers already on it, breaking ties by the lower host
/// id (§4.C).
pub struct ActiveServers;

impl AllocationPolicy for ActiveServers {
    fn select(&self, candidates: &[Rc<RefCell<HostView>>], server: &Server) -> Option<HostId> {
        let mut best: Option<(HostId, u32)> = None;
        for view in candidates {
            let view = view.borrow();
            if !view.has_capacity_for(&server.flavor) {
                continue;
            }
            let candidate = (view.host_id, view.number_of_active_servers);
            best = Some(match best {
                None => candidate,
                Some(current) if candidate.1 > current.1 => candidate,
                Some(current) if candidate.1 == current.1 && candidate.0 < current.0 => candidate,
                Some(current) => current,
            });
        }
        best.map(|(id, _)| id)
    }
}
