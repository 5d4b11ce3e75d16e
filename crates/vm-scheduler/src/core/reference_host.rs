//! Reference `Host` implementation (§10.2): a minimal fixture that models
//! capacity, UP/DOWN state and VM start/stop timing, sufficient to drive the
//! dispatch loop and its test suite. Not a second hypervisor: no CPU-slice
//! accounting, power modelling or migration, and it never reports
//! utilization, energy or SLA metrics.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::cell::RefCell;

use serde::Serialize;

use dslab_core::cast;
use dslab_core::component::Id as HostId;
use dslab_core::context::SimulationContext;
use dslab_core::event::Event;
use dslab_core::handler::EventHandler;
use dslab_core::log_debug;

use crate::core::common::{Id as VmId, Labels};
use crate::core::events::{HostSpawnResult, HostStateChangedEvt, VmStateChangedEvt};
use crate::core::host::{Host, HostModel, HostState};
use crate::core::vm::{Server, ServerState};

/// Self-addressed tick marking the end of a VM's run (§10.2).
#[derive(Serialize, Clone)]
struct RuntimeElapsed {
    vm_id: VmId,
}

/// A VM placed on this host, tracked only well enough to release its
/// reservation and report completion.
struct Placement {
    server: Rc<RefCell<Server>>,
    cpu_count: u32,
    memory_size: u64,
}

/// Minimal reference host: fixed capacity, run-to-completion VM lifetime
/// taken from `server.meta["runtime_ms"]` (falling back to a configured
/// default), no preemption.
pub struct ReferenceHost {
    id: HostId,
    ctx: SimulationContext,
    model: HostModel,
    state: HostState,
    meta: Labels,
    default_runtime_ms: f64,
    message_delay: f64,

    provisioned_cores: u32,
    available_memory: u64,
    placements: HashMap<VmId, Placement>,
    listeners: HashSet<HostId>,
}

impl ReferenceHost {
    pub fn new(ctx: SimulationContext, model: HostModel, default_runtime_ms: f64, message_delay: f64) -> Self {
        Self {
            id: ctx.id(),
            ctx,
            model,
            state: HostState::Up,
            meta: Labels::new(),
            default_runtime_ms,
            message_delay,
            provisioned_cores: 0,
            available_memory: model.memory_size,
            placements: HashMap::new(),
            listeners: HashSet::new(),
        }
    }

    fn has_capacity(&self, cpu_count: u32, memory_size: u64) -> bool {
        self.provisioned_cores + cpu_count <= self.model.cpu_count && memory_size <= self.available_memory
    }

    /// Flips this host's operational state and notifies every registered
    /// listener (§4.A, used by tests to exercise S4's DOWN→UP transition).
    pub fn set_state(&mut self, state: HostState) {
        if self.state == state {
            return;
        }
        self.state = state;
        let up = state == HostState::Up;
        for listener in self.listeners.clone() {
            self.ctx.emit(HostStateChangedEvt { up }, listener, self.message_delay);
        }
    }

    fn runtime_ms(&self, server: &Server) -> f64 {
        server
            .meta
            .get("runtime_ms")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(self.default_runtime_ms)
    }

    fn on_runtime_elapsed(&mut self, vm_id: VmId) {
        let Some(placement) = self.placements.remove(&vm_id) else {
            return;
        };
        self.provisioned_cores = self.provisioned_cores.saturating_sub(placement.cpu_count);
        self.available_memory += placement.memory_size;
        log_debug!(self.ctx, "vm {} finished on host {}", vm_id, self.id);
        for listener in self.listeners.clone() {
            self.ctx.emit(
                VmStateChangedEvt {
                    vm_id,
                    state: ServerState::Terminated,
                },
                listener,
                self.message_delay,
            );
        }
    }
}

impl Host for ReferenceHost {
    fn id(&self) -> HostId {
        self.id
    }

    fn state(&self) -> HostState {
        self.state
    }

    fn model(&self) -> HostModel {
        self.model
    }

    fn meta(&self) -> &Labels {
        &self.meta
    }

    fn can_fit(&self, server: &Server) -> bool {
        self.state == HostState::Up && self.has_capacity(server.flavor.cpu_count, server.flavor.memory_size)
    }

    fn spawn(&mut self, server: Rc<RefCell<Server>>, requester: HostId) {
        let vm_id = server.borrow().id;
        let accepted = self.can_fit(&server.borrow());
        if !accepted {
            log_debug!(self.ctx, "host {} rejecting spawn of vm {}", self.id, vm_id);
            self.ctx.emit(HostSpawnResult { vm_id, accepted }, requester, self.message_delay);
            for listener in self.listeners.clone() {
                self.ctx.emit(
                    VmStateChangedEvt {
                        vm_id,
                        state: ServerState::Error,
                    },
                    listener,
                    self.message_delay,
                );
            }
            return;
        }
        let cpu_count = server.borrow().flavor.cpu_count;
        let memory_size = server.borrow().flavor.memory_size;
        self.provisioned_cores += cpu_count;
        self.available_memory -= memory_size;
        let runtime_ms = self.runtime_ms(&server.borrow());
        self.placements.insert(
            vm_id,
            Placement {
                server,
                cpu_count,
                memory_size,
            },
        );
        log_debug!(self.ctx, "host {} accepted vm {}, runtime {} ms", self.id, vm_id, runtime_ms);
        self.ctx.emit(HostSpawnResult { vm_id, accepted }, requester, self.message_delay);
        self.ctx.emit_self(RuntimeElapsed { vm_id }, runtime_ms);
    }

    fn add_listener(&mut self, listener: HostId) {
        self.listeners.insert(listener);
    }

    fn remove_listener(&mut self, listener: HostId) {
        self.listeners.remove(&listener);
    }
}

impl EventHandler for ReferenceHost {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            RuntimeElapsed { vm_id } => {
                self.on_runtime_elapsed(vm_id);
            }
        })
    }
}
