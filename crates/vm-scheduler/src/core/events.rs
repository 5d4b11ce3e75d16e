//! Events exchanged between the service, the quantum timer and hosts.

use serde::Serialize;

use crate::core::common::Id as VmId;
use crate::core::vm::ServerState;

/// Self-addressed tick that drives the dispatch loop (§4.E). At most one is
/// ever pending (`Service::dispatch_pending`).
#[derive(Serialize, Clone)]
pub struct DispatchTick {}

/// Reply to a `host.spawn` attempt, awaited via `async_detailed_handle_event`
/// keyed by `vm_id` so concurrently in-flight spawns on the same host don't
/// collide (§10.1).
#[derive(Serialize, Clone)]
pub struct HostSpawnResult {
    pub vm_id: VmId,
    pub accepted: bool,
}

/// Host UP/DOWN transition, emitted by a host to its listeners (§4.A, §4.J).
#[derive(Serialize, Clone)]
pub struct HostStateChangedEvt {
    pub up: bool,
}

/// VM state transition reported by the host currently running `vm_id`
/// (§4.J). Only `Terminated` and `Error` are meaningful to the listener;
/// other states never originate from a host.
#[derive(Serialize, Clone)]
pub struct VmStateChangedEvt {
    pub vm_id: VmId,
    pub state: ServerState,
}
