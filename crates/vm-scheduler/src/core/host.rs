//! The `Host` contract (§4.A): the external collaborator the scheduling core
//! depends on but never looks inside. `crate::core::reference_host` ships the
//! one reference implementation used to drive the dispatch loop in tests.

use std::cell::RefCell;
use std::rc::Rc;

use dslab_core::component::Id as HostId;
use serde::Serialize;

use crate::core::common::Labels;
use crate::core::vm::Server;

/// Static capacity of a host. Immutable for the host's lifetime.
#[derive(Clone, Copy, Serialize)]
pub struct HostModel {
    pub cpu_count: u32,
    pub memory_size: u64,
}

/// Operational state of a host (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HostState {
    Up,
    Down,
}

/// Contract a compute node must satisfy to participate in scheduling (§4.A).
///
/// The core treats a host as a black box: it never inspects hypervisor
/// internals, CPU slices or power draw. `spawn` is asynchronous — its
/// eventual outcome arrives as a `HostSpawnResult` event to `requester`
/// rather than as a return value, and success transitions the VM into
/// `Running` only once that event is observed.
pub trait Host {
    fn id(&self) -> HostId;
    fn state(&self) -> HostState;
    fn model(&self) -> HostModel;
    fn meta(&self) -> &Labels;
    fn can_fit(&self, server: &Server) -> bool;
    /// Attempts to start `server`. Emits a `HostSpawnResult` to `requester`
    /// and, on success, later a terminal `VmStateChangedEvt` to every
    /// registered listener when the VM finishes or fails mid-run.
    fn spawn(&mut self, server: Rc<RefCell<Server>>, requester: HostId);
    fn add_listener(&mut self, listener: HostId);
    fn remove_listener(&mut self, listener: HostId);
}
